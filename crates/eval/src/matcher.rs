use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::EvalError;
use crate::model::{doc_key, CellValue, ColumnScore, Mismatch, MismatchReason, RowMatch, Table};
use crate::normalize::normalize;

/// Cell equality for the exact matcher.
///
/// Text on either side compares normalized display forms; otherwise two
/// missing cells are equal and numbers compare raw.
pub fn cells_equal(model: &CellValue, truth: &CellValue) -> bool {
    match (model, truth) {
        (CellValue::Text(_), _) | (_, CellValue::Text(_)) => {
            !model.is_missing()
                && !truth.is_missing()
                && normalize(&model.display()) == normalize(&truth.display())
        }
        (CellValue::Missing, CellValue::Missing) => true,
        (CellValue::Number(a), CellValue::Number(b)) => a == b,
        _ => false,
    }
}

/// Index rows by document key, last write wins. Returns the index, the keys
/// in first-appearance order, and the number of rows without a key.
pub(crate) fn index_by_key<'a>(
    table: &'a Table,
    key_idx: usize,
) -> (HashMap<String, &'a [CellValue]>, Vec<String>, usize) {
    let mut index: HashMap<String, &[CellValue]> = HashMap::new();
    let mut order = Vec::new();
    let mut skipped = 0;

    for row in &table.rows {
        match doc_key(row, key_idx) {
            Some(key) => {
                if index.insert(key.clone(), row.as_slice()).is_none() {
                    order.push(key);
                }
            }
            None => skipped += 1,
        }
    }

    (index, order, skipped)
}

/// Join two single-row-per-key tables on `key_column` and compare them cell by cell.
pub fn match_rows(model: &Table, truth: &Table, key_column: &str) -> Result<RowMatch, EvalError> {
    let model_key = model.key_index("model", key_column)?;
    let truth_key = truth.key_index("truth", key_column)?;

    let (model_index, _, model_skipped) = index_by_key(model, model_key);
    let (truth_index, truth_keys, truth_skipped) = index_by_key(truth, truth_key);
    if model_skipped + truth_skipped > 0 {
        warn!(model_skipped, truth_skipped, "rows without a document key were skipped");
    }

    // (column name, truth index, model index if shared)
    let compared: Vec<(&str, usize, Option<usize>)> = truth
        .columns
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != truth_key)
        .map(|(i, c)| (c.as_str(), i, model.column_index(c)))
        .collect();

    let extra_columns: Vec<String> = model
        .columns
        .iter()
        .filter(|c| c.as_str() != key_column && !truth.has_column(c))
        .cloned()
        .collect();

    let mut exact_matches = 0;
    let mut matched_keys = 0;
    let mut column_hits = vec![0usize; compared.len()];
    let mut mismatches = Vec::new();

    for key in &truth_keys {
        let truth_row = truth_index[key];
        let Some(model_row) = model_index.get(key) else {
            debug!(key = %key, "key missing in model results");
            mismatches.push(Mismatch {
                key: key.clone(),
                reason: MismatchReason::KeyMissingInModel,
                model: None,
                truth: Some(values_of(truth, truth_row)),
            });
            continue;
        };
        matched_keys += 1;

        let mut differing = Vec::new();
        for (slot, (name, ti, mi)) in compared.iter().enumerate() {
            let Some(mi) = mi else { continue };
            if cells_equal(&model_row[*mi], &truth_row[*ti]) {
                column_hits[slot] += 1;
            } else {
                differing.push(name.to_string());
            }
        }

        if differing.is_empty() {
            exact_matches += 1;
        } else {
            debug!(key = %key, columns = ?differing, "row mismatch");
            mismatches.push(Mismatch {
                key: key.clone(),
                reason: MismatchReason::ValueMismatch { columns: differing },
                model: Some(values_of(model, model_row)),
                truth: Some(values_of(truth, truth_row)),
            });
        }
    }

    let columns = compared
        .iter()
        .zip(&column_hits)
        .map(|((name, _, mi), hits)| match mi {
            None => ColumnScore::missing_in_model(name),
            Some(_) if matched_keys == 0 => ColumnScore::no_rows(name),
            Some(_) => ColumnScore::scored(name, *hits as f64 / matched_keys as f64),
        })
        .collect();

    let total_keys = truth_keys.len();
    let row_accuracy = if total_keys > 0 {
        exact_matches as f64 / total_keys as f64
    } else {
        0.0
    };

    Ok(RowMatch {
        key_column: key_column.to_string(),
        total_keys,
        exact_matches,
        row_accuracy,
        columns,
        extra_columns,
        mismatches,
        skipped_rows: model_skipped + truth_skipped,
    })
}

fn values_of(table: &Table, row: &[CellValue]) -> crate::model::RowValues {
    crate::model::RowValues(table.columns.iter().cloned().zip(row.iter().cloned()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{score_of, ColumnStatus};

    fn table(columns: &[&str], rows: &[&[&str]]) -> Table {
        let rows: Vec<Vec<&str>> = rows.iter().map(|r| r.to_vec()).collect();
        Table::from_text_rows(columns, &rows)
    }

    #[test]
    fn identical_tables_score_one() {
        let t = table(
            &["id", "name", "age"],
            &[&["E1", "Dupont", "54"], &["E2", "Martin", "61"]],
        );
        let out = match_rows(&t, &t, "id").unwrap();
        assert_eq!(out.row_accuracy, 1.0);
        assert!(out.mismatches.is_empty());
        assert!(out.columns.iter().all(|c| c.score == Some(1.0)));
    }

    #[test]
    fn normalization_makes_case_irrelevant() {
        let truth = table(&["id", "gene"], &[&["E1", "BRAF"]]);
        let model = table(&["id", "gene"], &[&["E1", "braf"]]);
        let out = match_rows(&model, &truth, "id").unwrap();
        assert_eq!(out.row_accuracy, 1.0);
    }

    #[test]
    fn missing_key_counts_in_denominator() {
        let truth = table(&["id", "gene"], &[&["E1", "BRAF"], &["E2", "KRAS"]]);
        let model = table(&["id", "gene"], &[&["E1", "BRAF"]]);
        let out = match_rows(&model, &truth, "id").unwrap();
        assert_eq!(out.total_keys, 2);
        assert_eq!(out.exact_matches, 1);
        assert_eq!(out.row_accuracy, 0.5);
        assert_eq!(out.mismatches.len(), 1);
        assert_eq!(out.mismatches[0].key, "E2");
        assert_eq!(out.mismatches[0].reason, MismatchReason::KeyMissingInModel);
        // column accuracy only covers matched keys
        assert_eq!(score_of(&out.columns, "gene"), Some(1.0));
    }

    #[test]
    fn value_mismatch_lists_columns() {
        let truth = table(&["id", "gene", "exon"], &[&["E1", "BRAF", "15"]]);
        let model = table(&["id", "gene", "exon"], &[&["E1", "BRAF", "11"]]);
        let out = match_rows(&model, &truth, "id").unwrap();
        assert_eq!(out.row_accuracy, 0.0);
        assert_eq!(
            out.mismatches[0].reason,
            MismatchReason::ValueMismatch { columns: vec!["exon".into()] }
        );
        assert_eq!(score_of(&out.columns, "gene"), Some(1.0));
        assert_eq!(score_of(&out.columns, "exon"), Some(0.0));
    }

    #[test]
    fn column_missing_in_model_is_reported_not_fatal() {
        let truth = table(&["id", "gene", "sex"], &[&["E1", "BRAF", "F"]]);
        let model = table(&["id", "gene", "notes"], &[&["E1", "BRAF", "x"]]);
        let out = match_rows(&model, &truth, "id").unwrap();
        let sex = out.columns.iter().find(|c| c.column == "sex").unwrap();
        assert_eq!(sex.status, ColumnStatus::MissingInModel);
        assert_eq!(sex.score, None);
        assert_eq!(out.extra_columns, vec!["notes".to_string()]);
        assert_eq!(out.row_accuracy, 1.0);
    }

    #[test]
    fn missing_cells_equal_each_other_only() {
        assert!(cells_equal(&CellValue::Missing, &CellValue::Missing));
        assert!(!cells_equal(&CellValue::Missing, &CellValue::Number(0.0)));
        assert!(!cells_equal(&CellValue::Missing, &CellValue::Text("".into())));
        assert!(cells_equal(&CellValue::Number(45.0), &CellValue::Text("45".into())));
    }

    #[test]
    fn keys_compare_by_raw_value() {
        let truth = table(&["id", "gene"], &[&["E1", "BRAF"]]);
        let model = table(&["id", "gene"], &[&["e1", "BRAF"]]);
        let out = match_rows(&model, &truth, "id").unwrap();
        assert_eq!(out.row_accuracy, 0.0);
        assert_eq!(out.mismatches[0].key, "E1");
        assert_eq!(out.mismatches[0].reason, MismatchReason::KeyMissingInModel);
    }

    #[test]
    fn duplicate_keys_last_write_wins() {
        let truth = table(&["id", "gene"], &[&["E1", "BRAF"]]);
        let model = table(&["id", "gene"], &[&["E1", "KRAS"], &["E1", "braf"]]);
        let out = match_rows(&model, &truth, "id").unwrap();
        assert_eq!(out.row_accuracy, 1.0);
    }

    #[test]
    fn empty_truth_is_zero_not_panic() {
        let truth = table(&["id", "gene"], &[]);
        let model = table(&["id", "gene"], &[&["E1", "BRAF"]]);
        let out = match_rows(&model, &truth, "id").unwrap();
        assert_eq!(out.row_accuracy, 0.0);
        assert_eq!(out.columns[0].status, ColumnStatus::NoRows);
    }

    #[test]
    fn absent_key_column_is_an_error() {
        let truth = table(&["id", "gene"], &[&["E1", "BRAF"]]);
        let model = table(&["exam", "gene"], &[&["E1", "BRAF"]]);
        let err = match_rows(&model, &truth, "id").unwrap_err();
        assert!(err.to_string().contains("model table"));
    }
}
