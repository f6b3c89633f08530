use crate::model::CellValue;

/// Levenshtein distance between the display forms of two cells.
///
/// Both missing → 0; one missing → length of the other's display form.
pub fn distance(a: &CellValue, b: &CellValue) -> usize {
    match (a, b) {
        (CellValue::Missing, CellValue::Missing) => 0,
        (CellValue::Missing, other) | (other, CellValue::Missing) => char_len(&other.display()),
        _ => strsim::levenshtein(&a.display(), &b.display()),
    }
}

/// Length-normalized similarity in [0, 1] with a reject threshold.
///
/// A normalized distance at or above `threshold` scores 0 instead of a small
/// positive value.
pub fn similarity(a: &CellValue, b: &CellValue, threshold: f64) -> f64 {
    let (a_str, b_str) = match (a, b) {
        (CellValue::Missing, CellValue::Missing) => return 1.0,
        (CellValue::Missing, _) | (_, CellValue::Missing) => return 0.0,
        (CellValue::Number(x), CellValue::Number(y)) => {
            (format!("{}", x.trunc() as i64), format!("{}", y.trunc() as i64))
        }
        _ => (a.display(), b.display()),
    };

    let longest = char_len(&a_str).max(char_len(&b_str));
    let normalized = if longest > 0 {
        strsim::levenshtein(&a_str, &b_str) as f64 / longest as f64
    } else {
        0.0
    };

    if normalized < threshold {
        1.0 - normalized
    } else {
        0.0
    }
}

/// Character count of a row's cells, the cost of a record nothing can be paired with.
pub fn content_len(cells: &[CellValue]) -> usize {
    cells.iter().map(|c| char_len(&c.display())).sum()
}

/// Summed per-column distance between two equally shaped rows.
pub fn row_distance(a: &[CellValue], b: &[CellValue]) -> usize {
    a.iter().zip(b).map(|(x, y)| distance(x, y)).sum()
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
