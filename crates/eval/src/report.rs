use std::fmt::Write as _;

use crate::model::{
    CellValue, ColumnScore, ColumnSimilarity, ColumnStatus, EvalResult, RowMatch, SetMatch,
    SimilarityMatch, Table, TimeStats,
};

pub const MISMATCH_COLUMNS: &[&str] = &["dataset", "key", "reason", "model", "truth"];

/// Human-readable summary of a run. Mismatch listings show at most
/// `display_limit` entries; the full lists stay in the result.
pub fn render_text(result: &EvalResult, display_limit: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "---- Evaluating {} ----", result.meta.config_name);

    if let Some(ref meta) = result.metadata {
        render_row_match(&mut out, &meta.exact, display_limit);
        render_similarity(&mut out, "metadata", &meta.similarity);
    }

    if let Some(ref muts) = result.mutations {
        render_set_match(&mut out, &muts.exact, display_limit);
        render_distance(&mut out, &muts.distance);
        render_similarity(&mut out, "mutations", &muts.similarity);
    }

    if !result.timings.is_empty() {
        let _ = writeln!(out, "\nTime statistics:");
        for t in &result.timings {
            render_time_stats(&mut out, t);
        }
    }

    out
}

pub fn render_row_match(out: &mut String, m: &RowMatch, display_limit: usize) {
    let _ = writeln!(
        out,
        "Line-by-line exact match accuracy ({} matched): {:.3} ({}/{})",
        m.key_column, m.row_accuracy, m.exact_matches, m.total_keys
    );

    if m.mismatches.is_empty() {
        let _ = writeln!(out, "All rows match exactly.");
    } else {
        let _ = writeln!(out, "\nTotal mismatches: {}", m.mismatches.len());
        let _ = writeln!(out, "Mismatched rows (showing up to {display_limit}):");
        for mm in m.mismatches.iter().take(display_limit) {
            let _ = writeln!(out, "{} {}: {}", m.key_column, mm.key, mm.reason);
            if let Some(ref model) = mm.model {
                let _ = writeln!(out, "  Model: {model}");
            }
            if let Some(ref truth) = mm.truth {
                let _ = writeln!(out, "  True:  {truth}");
            }
        }
    }

    let _ = writeln!(out, "\nPer-column accuracy (for matched {}):", m.key_column);
    render_columns(out, &m.columns);
    if !m.extra_columns.is_empty() {
        let _ = writeln!(out, "  (not in reference data: {})", m.extra_columns.join(", "));
    }
}

pub fn render_set_match(out: &mut String, m: &SetMatch, display_limit: usize) {
    let _ = writeln!(
        out,
        "\nExtracted mutations accuracy: {:.3} ({}/{})",
        m.exact_match_rate, m.matched_keys, m.total_keys
    );
    for c in &m.missing_columns {
        let _ = writeln!(out, "  {c}: column missing in model results");
    }
    if !m.extra_columns.is_empty() {
        let _ = writeln!(out, "  (not in reference data: {})", m.extra_columns.join(", "));
    }
    if m.mismatches.is_empty() {
        let _ = writeln!(out, "All {} mutation sets match exactly.", m.key_column);
        return;
    }
    let _ = writeln!(out, "Mismatches (up to {display_limit}):");
    for mm in m.mismatches.iter().take(display_limit) {
        let _ = writeln!(out, "{} {}: {}", m.key_column, mm.key, mm.reason);
        let model: Vec<String> = mm.model_rows.iter().map(|r| r.to_string()).collect();
        let truth: Vec<String> = mm.truth_rows.iter().map(|r| r.to_string()).collect();
        let _ = writeln!(out, "  Model: [{}]", model.join(", "));
        let _ = writeln!(out, "  True:  [{}]", truth.join(", "));
    }
}

pub fn render_distance(out: &mut String, m: &SimilarityMatch) {
    let worst = m
        .keys
        .iter()
        .max_by(|a, b| a.average.total_cmp(&b.average))
        .filter(|k| k.total > 0);
    let _ = writeln!(
        out,
        "Mean alignment distance per {}: {:.3} over {} keys",
        m.key_column,
        m.mean_distance,
        m.keys.len()
    );
    if let Some(k) = worst {
        let _ = writeln!(
            out,
            "  worst: {} (avg {:.3}, {} model rows vs {} reference rows)",
            k.key, k.average, k.model_rows, k.truth_rows
        );
    }
}

pub fn render_similarity(out: &mut String, label: &str, s: &ColumnSimilarity) {
    let _ = writeln!(out, "\nAverage ANLS per column ({label}):");
    if s.hallucinations > 0 {
        let _ = writeln!(
            out,
            "  count mismatch: {} rows, penalty factor {:.3}",
            s.hallucinations, s.penalty
        );
    }
    render_columns(out, &s.columns);
    match s.average() {
        Some(avg) => {
            let _ = writeln!(out, "Average levenshtein similarity for {label}: {avg:.3}");
        }
        None => {
            let _ = writeln!(out, "No matching rows found for {label} similarity.");
        }
    }
}

pub fn render_time_stats(out: &mut String, t: &TimeStats) {
    let _ = writeln!(
        out,
        "  {} - Avg: {:.2}s, Std: {:.2}s, Min: {:.2}s, Max: {:.2}s (n={})",
        t.column, t.mean, t.std, t.min, t.max, t.count
    );
}

fn render_columns(out: &mut String, columns: &[ColumnScore]) {
    for c in columns {
        let _ = match (c.status, c.score) {
            (ColumnStatus::MissingInModel, _) => {
                writeln!(out, "  {}: column missing in model results", c.column)
            }
            (_, Some(score)) => writeln!(out, "  {}: {:.3}", c.column, score),
            (_, None) => writeln!(out, "  {}: n/a", c.column),
        };
    }
}

/// Every mismatch of a run as a flat table for persistence.
pub fn mismatch_table(result: &EvalResult) -> Table {
    let mut table = Table::new(MISMATCH_COLUMNS.iter().map(|s| s.to_string()).collect());
    let text = |s: String| if s.is_empty() { CellValue::Missing } else { CellValue::Text(s) };

    if let Some(ref meta) = result.metadata {
        for mm in &meta.exact.mismatches {
            table.push_row(vec![
                CellValue::Text("metadata".into()),
                CellValue::Text(mm.key.clone()),
                CellValue::Text(mm.reason.to_string()),
                text(mm.model.as_ref().map(|r| r.to_string()).unwrap_or_default()),
                text(mm.truth.as_ref().map(|r| r.to_string()).unwrap_or_default()),
            ]);
        }
    }

    if let Some(ref muts) = result.mutations {
        for mm in &muts.exact.mismatches {
            let join = |rows: &[crate::model::RowValues]| {
                rows.iter().map(|r| r.to_string()).collect::<Vec<_>>().join("; ")
            };
            table.push_row(vec![
                CellValue::Text("mutations".into()),
                CellValue::Text(mm.key.clone()),
                CellValue::Text(mm.reason.to_string()),
                text(join(&mm.model_rows)),
                text(join(&mm.truth_rows)),
            ]);
        }
    }

    table
}
