use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::EvalError;
use crate::model::{doc_key, CellValue, Table};

/// Source text of the documents the model read, looked up by document key.
pub trait DocumentSource {
    /// `Ok(None)` when no document exists for `key`.
    fn document_text(&self, key: &str) -> Result<Option<String>, String>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum GroundingStatus {
    DocumentNotFound,
    ReadFailed(String),
    ValueNotFound,
}

impl std::fmt::Display for GroundingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DocumentNotFound => write!(f, "document not found"),
            Self::ReadFailed(msg) => write!(f, "cannot read document: {msg}"),
            Self::ValueNotFound => write!(f, "value not found in document"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroundingFinding {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub status: GroundingStatus,
}

/// True when `value` appears in `text` followed by whitespace or at a line end.
pub fn value_in_text(value: &str, text: &str) -> bool {
    let escaped = regex::escape(value);
    match Regex::new(&format!(r"(?m){escaped}\s|{escaped}$")) {
        Ok(re) => re.is_match(text),
        Err(_) => text.contains(value),
    }
}

/// Flag rows whose document is absent, or whose `value_column` value does not
/// occur in the document text. Without a value column only document presence
/// is checked.
pub fn check_grounding(
    table: &Table,
    key_column: &str,
    value_column: Option<&str>,
    source: &dyn DocumentSource,
) -> Result<Vec<GroundingFinding>, EvalError> {
    let key_idx = table.key_index("model", key_column)?;
    let value_idx = value_column
        .map(|c| table.require_column("model", c))
        .transpose()?;

    let mut findings = Vec::new();
    for row in &table.rows {
        let Some(key) = doc_key(row, key_idx) else { continue };
        let value = match value_idx {
            Some(i) => match &row[i] {
                CellValue::Missing => continue,
                cell => Some(cell.display()),
            },
            None => None,
        };

        let status = match source.document_text(&key) {
            Ok(None) => Some(GroundingStatus::DocumentNotFound),
            Err(msg) => {
                warn!(key = %key, error = %msg, "cannot read document");
                Some(GroundingStatus::ReadFailed(msg))
            }
            Ok(Some(text)) => match &value {
                Some(v) if !value_in_text(v, &text) => Some(GroundingStatus::ValueNotFound),
                _ => None,
            },
        };

        if let Some(status) = status {
            debug!(key = %key, value = ?value, %status, "ungrounded row");
            findings.push(GroundingFinding { key, value, status });
        }
    }

    Ok(findings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MemorySource(HashMap<String, String>);

    impl DocumentSource for MemorySource {
        fn document_text(&self, key: &str) -> Result<Option<String>, String> {
            if key == "broken" {
                return Err("permission denied".into());
            }
            Ok(self.0.get(key).cloned())
        }
    }

    fn source() -> MemorySource {
        let mut docs = HashMap::new();
        docs.insert(
            "E1".to_string(),
            "Gene BRAF\nMutation c.1799T>A p.(Val600Glu) detected\nKRAS G12C".to_string(),
        );
        MemorySource(docs)
    }

    #[test]
    fn whole_token_match() {
        let text = "variant p.(Val600Glu) found\nG12C";
        assert!(value_in_text("p.(Val600Glu)", text));
        assert!(value_in_text("G12C", text));
        assert!(!value_in_text("G12", text));
        assert!(!value_in_text("Val600", text));
    }

    #[test]
    fn flags_missing_documents_and_values() {
        let t = Table::from_text_rows(
            &["Examen", "Mutation"],
            &[
                vec!["E1", "p.(Val600Glu)"],
                vec!["E1", "G12D"],
                vec!["E1", ""],
                vec!["E9", "L858R"],
                vec!["broken", "V600E"],
            ],
        );
        let findings = check_grounding(&t, "Examen", Some("Mutation"), &source()).unwrap();
        let statuses: Vec<(&str, &GroundingStatus)> =
            findings.iter().map(|f| (f.key.as_str(), &f.status)).collect();
        assert_eq!(
            statuses,
            vec![
                ("E1", &GroundingStatus::ValueNotFound),
                ("E9", &GroundingStatus::DocumentNotFound),
                ("broken", &GroundingStatus::ReadFailed("permission denied".into())),
            ]
        );
    }

    #[test]
    fn presence_only_without_value_column() {
        let t = Table::from_text_rows(&["Examen", "Nom"], &[vec!["E1", "X"], vec!["E2", "Y"]]);
        let findings = check_grounding(&t, "Examen", None, &source()).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].key, "E2");
        assert_eq!(findings[0].value, None);
    }
}
