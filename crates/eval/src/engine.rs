use tracing::{info, warn};

use crate::config::{EvalConfig, DEFAULT_TIME_COLUMNS};
use crate::error::EvalError;
use crate::matcher::match_rows;
use crate::model::{
    EvalInput, EvalMeta, EvalResult, MetadataReport, MutationReport, Table, TablePair, TimeStats,
};
use crate::reconcile::{reconcile_exact, reconcile_similarity};
use crate::similarity::{aggregate_similarity, metadata_similarity, SimilarityOptions};
use crate::stats::time_stats;

/// Run every dataset the config names against the pre-loaded tables.
pub fn run(config: &EvalConfig, input: &EvalInput) -> Result<EvalResult, EvalError> {
    let key = config.key_column.as_str();
    let threshold = config.threshold.get();

    let metadata = match (&config.metadata, &input.metadata) {
        (Some(_), Some(pair)) => Some(evaluate_metadata(pair, key, threshold)?),
        (Some(_), None) => return Err(not_loaded("metadata")),
        (None, _) => None,
    };

    let mutations = match (&config.mutations, &input.mutations) {
        (Some(m), Some(pair)) => {
            let options = SimilarityOptions {
                required_column: m.required_column.clone(),
                threshold,
            };
            Some(evaluate_mutations(pair, key, &options)?)
        }
        (Some(_), None) => return Err(not_loaded("mutations")),
        (None, _) => None,
    };

    let timings = match (&config.timings, &input.timings) {
        (Some(t), Some(table)) => {
            let columns: Vec<&str> = t.columns.iter().map(String::as_str).collect();
            timing_stats(table, &columns)
        }
        (None, Some(table)) => timing_stats(table, DEFAULT_TIME_COLUMNS),
        (Some(_), None) => return Err(not_loaded("timings")),
        (None, None) => Vec::new(),
    };

    info!(
        config = %config.name,
        metadata = metadata.is_some(),
        mutations = mutations.is_some(),
        timings = timings.len(),
        "evaluation complete"
    );

    Ok(EvalResult {
        meta: EvalMeta::new(&config.name, key, threshold),
        metadata,
        mutations,
        timings,
    })
}

/// Exact row match plus per-column similarity for one-row-per-document data.
pub fn evaluate_metadata(pair: &TablePair, key_column: &str, threshold: f64) -> Result<MetadataReport, EvalError> {
    let exact = match_rows(&pair.model, &pair.truth, key_column)?;
    let similarity = metadata_similarity(&pair.model, &pair.truth, key_column, threshold)?;
    info!(
        accuracy = exact.row_accuracy,
        matched = exact.exact_matches,
        total = exact.total_keys,
        "metadata scored"
    );
    Ok(MetadataReport { exact, similarity })
}

/// Set match, alignment distance and penalized similarity for
/// many-rows-per-document data.
pub fn evaluate_mutations(
    pair: &TablePair,
    key_column: &str,
    options: &SimilarityOptions,
) -> Result<MutationReport, EvalError> {
    let exact = reconcile_exact(&pair.model, &pair.truth, key_column)?;
    let distance = reconcile_similarity(&pair.model, &pair.truth, key_column)?;
    let similarity = aggregate_similarity(&pair.model, &pair.truth, key_column, options)?;
    info!(
        exact_rate = exact.exact_match_rate,
        mean_distance = distance.mean_distance,
        penalty = similarity.penalty,
        "mutations scored"
    );
    Ok(MutationReport { exact, distance, similarity })
}

/// Stats for each named column that exists and holds numbers.
pub fn timing_stats<S: AsRef<str>>(table: &Table, columns: &[S]) -> Vec<TimeStats> {
    columns
        .iter()
        .filter_map(|c| {
            let stats = time_stats(table, c.as_ref());
            if stats.is_none() {
                warn!(column = c.as_ref(), "no timing values");
            }
            stats
        })
        .collect()
}

fn not_loaded(dataset: &str) -> EvalError {
    EvalError::ConfigValidation(format!("[{dataset}] is configured but no tables were loaded for it"))
}
