use std::collections::{BTreeMap, BTreeSet};

use ordered_float::OrderedFloat;
use tracing::{debug, warn};

use crate::distance::{content_len, row_distance};
use crate::error::EvalError;
use crate::model::{
    doc_key, CellValue, GroupMismatch, KeyDistance, MismatchReason, RowPair, RowValues, SetMatch,
    SimilarityMatch, Table,
};
use crate::normalize::normalize_cell;

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// Rows of one table partitioned by document key, projected onto a column list.
#[derive(Debug, Default)]
pub struct KeyGroups {
    pub groups: BTreeMap<String, Vec<Vec<CellValue>>>,
    pub skipped_rows: usize,
}

impl KeyGroups {
    pub fn rows(&self, key: &str) -> &[Vec<CellValue>] {
        self.groups.get(key).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn total_rows(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }
}

/// Partition `table` by `key_idx`, keeping only `projection` columns (in that order).
/// Rows keep their input order within a group.
pub fn group_by_key(table: &Table, key_idx: usize, projection: &[usize]) -> KeyGroups {
    let mut out = KeyGroups::default();
    for row in &table.rows {
        let Some(key) = doc_key(row, key_idx) else {
            out.skipped_rows += 1;
            continue;
        };
        let projected = projection.iter().map(|&i| row[i].clone()).collect();
        out.groups.entry(key).or_default().push(projected);
    }
    out
}

/// Columns scored for a dataset pair: truth columns the model also has, in truth order.
pub(crate) struct SharedColumns {
    pub names: Vec<String>,
    pub missing: Vec<String>,
    pub extra: Vec<String>,
    pub truth_idx: Vec<usize>,
    pub model_idx: Vec<usize>,
    pub truth_key: usize,
    pub model_key: usize,
}

pub(crate) fn shared_columns(
    model: &Table,
    truth: &Table,
    key_column: &str,
    include_key: bool,
) -> Result<SharedColumns, EvalError> {
    let model_key = model.key_index("model", key_column)?;
    let truth_key = truth.key_index("truth", key_column)?;

    let mut shared = SharedColumns {
        names: Vec::new(),
        missing: Vec::new(),
        extra: Vec::new(),
        truth_idx: Vec::new(),
        model_idx: Vec::new(),
        truth_key,
        model_key,
    };
    for (ti, name) in truth.columns.iter().enumerate() {
        if ti == truth_key && !include_key {
            continue;
        }
        match model.column_index(name) {
            Some(mi) => {
                shared.names.push(name.clone());
                shared.truth_idx.push(ti);
                shared.model_idx.push(mi);
            }
            None => {
                warn!(column = %name, "column missing in model results; not compared");
                shared.missing.push(name.clone());
            }
        }
    }
    shared.extra = model
        .columns
        .iter()
        .enumerate()
        .filter(|(mi, name)| *mi != model_key && !truth.has_column(name))
        .map(|(_, name)| name.clone())
        .collect();
    Ok(shared)
}

fn union_keys<'a>(a: &'a KeyGroups, b: &'a KeyGroups) -> BTreeSet<&'a str> {
    a.groups.keys().chain(b.groups.keys()).map(String::as_str).collect()
}

fn normalize_row(row: &[CellValue]) -> Vec<CellValue> {
    row.iter().map(normalize_cell).collect()
}

// ---------------------------------------------------------------------------
// Exact (set) mode
// ---------------------------------------------------------------------------

/// Hashable, ordered form of a normalized cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum CanonCell {
    Missing,
    Number(OrderedFloat<f64>),
    Text(String),
}

impl From<&CellValue> for CanonCell {
    fn from(value: &CellValue) -> Self {
        match normalize_cell(value) {
            CellValue::Missing => CanonCell::Missing,
            // 0.0 and -0.0 are one value
            CellValue::Number(n) => CanonCell::Number(OrderedFloat(n + 0.0)),
            CellValue::Text(s) => CanonCell::Text(s),
        }
    }
}

fn canonical_set(rows: &[Vec<CellValue>]) -> BTreeSet<Vec<CanonCell>> {
    rows.iter()
        .map(|row| row.iter().map(CanonCell::from).collect())
        .collect()
}

/// Compare, per document key, the set of normalized rows on each side.
///
/// Row order and repeated identical rows do not matter. Keys present on only
/// one side count toward the denominator.
pub fn reconcile_exact(model: &Table, truth: &Table, key_column: &str) -> Result<SetMatch, EvalError> {
    let shared = shared_columns(model, truth, key_column, true)?;
    let model_groups = group_by_key(model, shared.model_key, &shared.model_idx);
    let truth_groups = group_by_key(truth, shared.truth_key, &shared.truth_idx);

    let keys = union_keys(&model_groups, &truth_groups);
    let mut matched_keys = 0;
    let mut mismatches = Vec::new();

    for key in &keys {
        let model_rows = model_groups.rows(key);
        let truth_rows = truth_groups.rows(key);

        if canonical_set(model_rows) == canonical_set(truth_rows) {
            matched_keys += 1;
            continue;
        }

        let reason = if model_rows.is_empty() {
            MismatchReason::KeyMissingInModel
        } else if truth_rows.is_empty() {
            MismatchReason::KeyMissingInTruth
        } else {
            MismatchReason::RowSetDiffers
        };
        debug!(key = %key, %reason, "group mismatch");

        let as_values = |rows: &[Vec<CellValue>]| -> Vec<RowValues> {
            rows.iter()
                .map(|r| RowValues(shared.names.iter().cloned().zip(normalize_row(r)).collect()))
                .collect()
        };
        mismatches.push(GroupMismatch {
            key: key.to_string(),
            reason,
            model_rows: as_values(model_rows),
            truth_rows: as_values(truth_rows),
        });
    }

    let total_keys = keys.len();
    let exact_match_rate = if total_keys > 0 {
        matched_keys as f64 / total_keys as f64
    } else {
        0.0
    };

    Ok(SetMatch {
        key_column: key_column.to_string(),
        columns: shared.names,
        missing_columns: shared.missing,
        extra_columns: shared.extra,
        total_keys,
        matched_keys,
        exact_match_rate,
        mismatches,
        skipped_rows: model_groups.skipped_rows + truth_groups.skipped_rows,
    })
}

// ---------------------------------------------------------------------------
// Similarity (greedy alignment) mode
// ---------------------------------------------------------------------------

/// Greedily pair model rows with truth rows under summed edit distance.
///
/// Each step takes the cheapest remaining pair (ties: lowest model index, then
/// lowest truth index). Rows left over on either side cost their own content
/// length. Both groups empty costs nothing.
pub fn align_group(key: &str, model_rows: &[Vec<CellValue>], truth_rows: &[Vec<CellValue>]) -> KeyDistance {
    let model_norm: Vec<Vec<CellValue>> = model_rows.iter().map(|r| normalize_row(r)).collect();
    let truth_norm: Vec<Vec<CellValue>> = truth_rows.iter().map(|r| normalize_row(r)).collect();

    let costs: Vec<Vec<usize>> = model_norm
        .iter()
        .map(|m| truth_norm.iter().map(|t| row_distance(m, t)).collect())
        .collect();

    let mut model_used = vec![false; model_norm.len()];
    let mut truth_used = vec![false; truth_norm.len()];
    let mut pairs = Vec::new();
    let mut total = 0;

    for _ in 0..model_norm.len().min(truth_norm.len()) {
        let mut best: Option<(usize, usize, usize)> = None;
        for (mi, row) in costs.iter().enumerate() {
            if model_used[mi] {
                continue;
            }
            for (ti, &cost) in row.iter().enumerate() {
                if truth_used[ti] {
                    continue;
                }
                if best.map_or(true, |(_, _, c)| cost < c) {
                    best = Some((mi, ti, cost));
                }
            }
        }

        let Some((mi, ti, cost)) = best else { break };
        model_used[mi] = true;
        truth_used[ti] = true;
        total += cost;
        pairs.push(RowPair { model_index: mi, truth_index: ti, distance: cost });
    }

    let unmatched_model: Vec<usize> = (0..model_norm.len()).filter(|&i| !model_used[i]).collect();
    let unmatched_truth: Vec<usize> = (0..truth_norm.len()).filter(|&i| !truth_used[i]).collect();
    total += unmatched_model.iter().map(|&i| content_len(&model_norm[i])).sum::<usize>();
    total += unmatched_truth.iter().map(|&i| content_len(&truth_norm[i])).sum::<usize>();

    let largest = model_norm.len().max(truth_norm.len());
    let average = if largest > 0 { total as f64 / largest as f64 } else { 0.0 };

    KeyDistance {
        key: key.to_string(),
        model_rows: model_norm.len(),
        truth_rows: truth_norm.len(),
        total,
        average,
        pairs,
        unmatched_model,
        unmatched_truth,
    }
}

/// Align every document key's groups and report per-key and mean distances.
pub fn reconcile_similarity(
    model: &Table,
    truth: &Table,
    key_column: &str,
) -> Result<SimilarityMatch, EvalError> {
    let shared = shared_columns(model, truth, key_column, false)?;
    let model_groups = group_by_key(model, shared.model_key, &shared.model_idx);
    let truth_groups = group_by_key(truth, shared.truth_key, &shared.truth_idx);

    let keys: Vec<KeyDistance> = union_keys(&model_groups, &truth_groups)
        .into_iter()
        .map(|key| {
            let aligned = align_group(key, model_groups.rows(key), truth_groups.rows(key));
            debug!(key = %key, total = aligned.total, average = aligned.average, "aligned group");
            aligned
        })
        .collect();

    let mean_distance = if keys.is_empty() {
        0.0
    } else {
        keys.iter().map(|k| k.average).sum::<f64>() / keys.len() as f64
    };

    Ok(SimilarityMatch {
        key_column: key_column.to_string(),
        columns: shared.names,
        missing_columns: shared.missing,
        extra_columns: shared.extra,
        keys,
        mean_distance,
        skipped_rows: model_groups.skipped_rows + truth_groups.skipped_rows,
    })
}
