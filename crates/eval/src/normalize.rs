use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::model::CellValue;

/// Canonical comparison form of a string: accents stripped, lowercased,
/// apostrophes and every whitespace character removed.
pub fn normalize(s: &str) -> String {
    // Lowercasing can expose new decompositions (e.g. 'İ'), so run to a fixpoint.
    let mut current = normalize_pass(s);
    for _ in 0..3 {
        let next = normalize_pass(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn normalize_pass(s: &str) -> String {
    s.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .filter(|c| *c != '\'' && *c != '\u{2019}' && !c.is_whitespace())
        .collect()
}

/// Normalize text cells; numbers and missing cells pass through.
pub fn normalize_cell(value: &CellValue) -> CellValue {
    match value {
        CellValue::Text(s) => CellValue::Text(normalize(s)),
        other => other.clone(),
    }
}
