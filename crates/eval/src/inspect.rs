use serde::Serialize;

use crate::error::EvalError;
use crate::model::{doc_key, RowValues, Table};

/// Which side of a dataset lacks a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Model,
    Truth,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Model => "model",
            Side::Truth => "truth",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetView {
    pub dataset: String,
    pub model_rows: Vec<RowValues>,
    pub truth_rows: Vec<RowValues>,
    pub missing: Vec<Side>,
}

/// Side-by-side rows of one document across several datasets.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentView {
    pub key: String,
    pub datasets: Vec<DatasetView>,
}

impl DocumentView {
    pub fn is_complete(&self) -> bool {
        self.datasets.iter().all(|d| d.missing.is_empty())
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for d in &self.datasets {
            out.push_str(&format!("\n{} for {}:\n", d.dataset, self.key));
            for side in &d.missing {
                out.push_str(&format!("  {} not found in {} data\n", self.key, side.as_str()));
            }
            out.push_str("  Model:\n");
            for r in &d.model_rows {
                out.push_str(&format!("    {r}\n"));
            }
            out.push_str("  True:\n");
            for r in &d.truth_rows {
                out.push_str(&format!("    {r}\n"));
            }
        }
        out
    }
}

/// Collect every row carrying `key` in each `(label, model, truth)` dataset.
/// An absent key is reported in `missing`, never as an error.
pub fn inspect_document(
    key: &str,
    datasets: &[(&str, &Table, &Table)],
    key_column: &str,
) -> Result<DocumentView, EvalError> {
    let mut views = Vec::with_capacity(datasets.len());

    for (label, model, truth) in datasets {
        let model_rows = rows_for(model, "model", key_column, key)?;
        let truth_rows = rows_for(truth, "truth", key_column, key)?;

        let mut missing = Vec::new();
        if model_rows.is_empty() {
            missing.push(Side::Model);
        }
        if truth_rows.is_empty() {
            missing.push(Side::Truth);
        }

        views.push(DatasetView { dataset: label.to_string(), model_rows, truth_rows, missing });
    }

    Ok(DocumentView { key: key.to_string(), datasets: views })
}

fn rows_for(table: &Table, role: &str, key_column: &str, key: &str) -> Result<Vec<RowValues>, EvalError> {
    let key_idx = table.key_index(role, key_column)?;
    Ok(table
        .records()
        .filter(|r| doc_key(r.cells(), key_idx).as_deref() == Some(key))
        .map(|r| r.to_values())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_rows_and_reports_gaps() {
        let meta_truth = Table::from_text_rows(&["exam", "name"], &[vec!["E1", "Dupont"]]);
        let meta_model = Table::from_text_rows(&["exam", "name"], &[vec!["E2", "Martin"]]);
        let mut_truth = Table::from_text_rows(
            &["exam", "gene"],
            &[vec!["E1", "BRAF"], vec!["E1", "KRAS"], vec!["E2", "EGFR"]],
        );
        let mut_model = Table::from_text_rows(&["exam", "gene"], &[vec!["E1", "BRAF"]]);

        let view = inspect_document(
            "E1",
            &[("metadata", &meta_model, &meta_truth), ("mutations", &mut_model, &mut_truth)],
            "exam",
        )
        .unwrap();

        assert!(!view.is_complete());
        assert_eq!(view.datasets[0].missing, vec![Side::Model]);
        assert_eq!(view.datasets[1].truth_rows.len(), 2);
        assert_eq!(view.datasets[1].model_rows.len(), 1);
        assert!(view.render().contains("E1 not found in model data"));
    }

    #[test]
    fn numeric_keys_match_display_form() {
        let t = Table::from_text_rows(&["exam", "gene"], &[vec!["1024", "BRAF"]]);
        let view = inspect_document("1024", &[("mutations", &t, &t)], "exam").unwrap();
        assert!(view.is_complete());
    }
}
