use tracing::debug;

use crate::distance::similarity;
use crate::error::EvalError;
use crate::matcher::index_by_key;
use crate::model::{CellValue, ColumnScore, ColumnSimilarity, Table};
use crate::normalize::normalize_cell;
use crate::reconcile::{group_by_key, shared_columns};

#[derive(Debug, Clone)]
pub struct SimilarityOptions {
    /// Rows where this column is missing carry no signal and are dropped first.
    pub required_column: Option<String>,
    pub threshold: f64,
}

impl Default for SimilarityOptions {
    fn default() -> Self {
        Self { required_column: None, threshold: crate::config::DEFAULT_THRESHOLD }
    }
}

/// Mean similarity per column, over rows aligned by position inside each
/// shared document key, scaled by the count-mismatch penalty.
///
/// Every column is scaled by the same factor, so over- or under-generated
/// records lower every reported score.
pub fn aggregate_similarity(
    model: &Table,
    truth: &Table,
    key_column: &str,
    options: &SimilarityOptions,
) -> Result<ColumnSimilarity, EvalError> {
    let (model, truth) = match &options.required_column {
        Some(column) => {
            let mi = model.require_column("model", column)?;
            let ti = truth.require_column("truth", column)?;
            (
                model.filter_rows(mi, |c| !c.is_missing()),
                truth.filter_rows(ti, |c| !c.is_missing()),
            )
        }
        None => (model.clone(), truth.clone()),
    };

    let shared = shared_columns(&model, &truth, key_column, false)?;
    let model_groups = group_by_key(&model, shared.model_key, &shared.model_idx);
    let truth_groups = group_by_key(&truth, shared.truth_key, &shared.truth_idx);

    let mut hallucinations = 0;
    let mut aligned: Vec<(&[CellValue], &[CellValue])> = Vec::new();
    for (key, truth_rows) in &truth_groups.groups {
        let Some(model_rows) = model_groups.groups.get(key) else { continue };
        hallucinations += model_rows.len().abs_diff(truth_rows.len());
        aligned.extend(
            model_rows
                .iter()
                .zip(truth_rows)
                .map(|(m, t)| (m.as_slice(), t.as_slice())),
        );
    }

    let model_rows = model_groups.total_rows();
    let truth_rows = truth_groups.total_rows();
    let largest = model_rows.max(truth_rows);
    let penalty = if largest > 0 {
        (1.0 - hallucinations as f64 / largest as f64).clamp(0.0, 1.0)
    } else {
        1.0
    };
    debug!(aligned = aligned.len(), hallucinations, penalty, "aggregated similarity");

    let columns = score_columns(&truth, &shared.names, shared.truth_key, &aligned, options.threshold, penalty);

    Ok(ColumnSimilarity {
        columns,
        aligned_rows: aligned.len(),
        hallucinations,
        model_rows,
        truth_rows,
        penalty,
    })
}

/// Single-row-per-key variant: rows joined on truth keys, last write wins,
/// no count penalty.
pub fn metadata_similarity(
    model: &Table,
    truth: &Table,
    key_column: &str,
    threshold: f64,
) -> Result<ColumnSimilarity, EvalError> {
    let shared = shared_columns(model, truth, key_column, false)?;
    let (model_index, _, _) = index_by_key(model, shared.model_key);
    let (truth_index, truth_keys, _) = index_by_key(truth, shared.truth_key);

    let project = |row: &[CellValue], idx: &[usize]| -> Vec<CellValue> {
        idx.iter().map(|&i| row[i].clone()).collect()
    };
    let pairs: Vec<(Vec<CellValue>, Vec<CellValue>)> = truth_keys
        .iter()
        .filter_map(|key| {
            let model_row: &[CellValue] = model_index.get(key)?;
            let truth_row: &[CellValue] = truth_index[key];
            Some((project(model_row, &shared.model_idx), project(truth_row, &shared.truth_idx)))
        })
        .collect();
    let aligned: Vec<(&[CellValue], &[CellValue])> =
        pairs.iter().map(|(m, t)| (m.as_slice(), t.as_slice())).collect();

    let columns = score_columns(truth, &shared.names, shared.truth_key, &aligned, threshold, 1.0);

    Ok(ColumnSimilarity {
        columns,
        aligned_rows: aligned.len(),
        hallucinations: 0,
        model_rows: model_index.len(),
        truth_rows: truth_index.len(),
        penalty: 1.0,
    })
}

/// Scores for every non-key truth column: shared columns get the penalized
/// mean similarity over `aligned` (positions follow `shared`), others are
/// missing in the model.
fn score_columns(
    truth: &Table,
    shared: &[String],
    truth_key: usize,
    aligned: &[(&[CellValue], &[CellValue])],
    threshold: f64,
    penalty: f64,
) -> Vec<ColumnScore> {
    truth
        .columns
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != truth_key)
        .map(|(_, name)| {
            let Some(pos) = shared.iter().position(|s| s == name) else {
                return ColumnScore::missing_in_model(name);
            };
            if aligned.is_empty() {
                return ColumnScore::no_rows(name);
            }
            let sum: f64 = aligned
                .iter()
                .map(|(m, t)| similarity(&normalize_cell(&m[pos]), &normalize_cell(&t[pos]), threshold))
                .sum();
            ColumnScore::scored(name, sum / aligned.len() as f64 * penalty)
        })
        .collect()
}
