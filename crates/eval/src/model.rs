use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::error::EvalError;

// ---------------------------------------------------------------------------
// Cells
// ---------------------------------------------------------------------------

/// Markers read as a missing cell, matching what spreadsheet exports and
/// model outputs use for "no value".
const MISSING_MARKERS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// A single table cell. Type is decided once at load time.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Missing,
    Text(String),
    Number(f64),
}

impl CellValue {
    /// Infer a cell from raw text: missing markers, then numbers, then text.
    pub fn from_input(input: &str) -> Self {
        let trimmed = input.trim();

        if trimmed.is_empty() || MISSING_MARKERS.contains(&trimmed) {
            return CellValue::Missing;
        }

        if let Ok(num) = trimmed.parse::<f64>() {
            if num.is_finite() {
                return CellValue::Number(num);
            }
        }

        CellValue::Text(trimmed.to_string())
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, CellValue::Missing)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// String form used for display and edit distances.
    /// Integral numbers render without a fractional part.
    pub fn display(&self) -> String {
        match self {
            CellValue::Missing => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
        }
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Missing => write!(f, "NaN"),
            other => write!(f, "{}", other.display()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

/// Ordered columns plus rows aligned with them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns, rows: Vec::new() }
    }

    /// Build a table from raw text cells, inferring each cell's type.
    pub fn from_text_rows<S: AsRef<str>>(columns: &[S], rows: &[Vec<S>]) -> Self {
        let mut table = Self::new(columns.iter().map(|c| c.as_ref().to_string()).collect());
        for row in rows {
            table.push_row(row.iter().map(|v| CellValue::from_input(v.as_ref())).collect());
        }
        table
    }

    /// Append a row, padding with missing cells or truncating to the column count.
    pub fn push_row(&mut self, mut cells: Vec<CellValue>) {
        cells.resize(self.columns.len(), CellValue::Missing);
        self.rows.push(cells);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Index of the document key column, or `MissingKeyColumn`.
    pub fn key_index(&self, role: &str, key_column: &str) -> Result<usize, EvalError> {
        self.column_index(key_column).ok_or_else(|| EvalError::MissingKeyColumn {
            table: role.into(),
            column: key_column.into(),
        })
    }

    /// Index of a required column, or `MissingColumn`.
    pub fn require_column(&self, role: &str, column: &str) -> Result<usize, EvalError> {
        self.column_index(column).ok_or_else(|| EvalError::MissingColumn {
            table: role.into(),
            column: column.into(),
        })
    }

    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.rows.iter().map(move |cells| Record { columns: &self.columns, cells })
    }

    /// Rows whose given column satisfies `keep`, as a new table.
    pub fn filter_rows(&self, column: usize, keep: impl Fn(&CellValue) -> bool) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|r| keep(&r[column])).cloned().collect(),
        }
    }
}

/// Document key of a row: the raw key cell's display form. Missing keys have none.
pub fn doc_key(cells: &[CellValue], key_idx: usize) -> Option<String> {
    match cells.get(key_idx) {
        None | Some(CellValue::Missing) => None,
        Some(cell) => Some(cell.display()),
    }
}

/// Borrowed view of one row together with its column names.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    columns: &'a [String],
    cells: &'a [CellValue],
}

impl<'a> Record<'a> {
    pub fn cells(&self) -> &'a [CellValue] {
        self.cells
    }

    pub fn to_values(&self) -> RowValues {
        RowValues(
            self.columns
                .iter()
                .cloned()
                .zip(self.cells.iter().cloned())
                .collect(),
        )
    }
}

/// Column/value pairs of one row, serialized as an ordered JSON object.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RowValues(pub Vec<(String, CellValue)>);

impl std::fmt::Display for RowValues {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, (_, v)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match v {
                CellValue::Text(s) => write!(f, "'{s}'")?,
                other => write!(f, "{other}")?,
            }
        }
        write!(f, "]")
    }
}

impl Serialize for RowValues {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (column, value) in &self.0 {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Model output and verified reference for one dataset.
#[derive(Debug, Clone, Default)]
pub struct TablePair {
    pub model: Table,
    pub truth: Table,
}

/// Pre-loaded tables for one evaluation run.
#[derive(Debug, Clone, Default)]
pub struct EvalInput {
    pub metadata: Option<TablePair>,
    pub mutations: Option<TablePair>,
    pub timings: Option<Table>,
}

// ---------------------------------------------------------------------------
// Column scores
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnStatus {
    Scored,
    MissingInModel,
    NoRows,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnScore {
    pub column: String,
    pub score: Option<f64>,
    pub status: ColumnStatus,
}

impl ColumnScore {
    pub fn scored(column: &str, score: f64) -> Self {
        Self { column: column.into(), score: Some(score), status: ColumnStatus::Scored }
    }

    pub fn missing_in_model(column: &str) -> Self {
        Self { column: column.into(), score: None, status: ColumnStatus::MissingInModel }
    }

    pub fn no_rows(column: &str) -> Self {
        Self { column: column.into(), score: None, status: ColumnStatus::NoRows }
    }
}

/// Look up a column's score in an ordered score list.
pub fn score_of(scores: &[ColumnScore], column: &str) -> Option<f64> {
    scores.iter().find(|s| s.column == column).and_then(|s| s.score)
}

/// Mean over the columns that have a score.
pub fn mean_score(scores: &[ColumnScore]) -> Option<f64> {
    let values: Vec<f64> = scores.iter().filter_map(|s| s.score).collect();
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

// ---------------------------------------------------------------------------
// Mismatches
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MismatchReason {
    KeyMissingInModel,
    KeyMissingInTruth,
    ValueMismatch { columns: Vec<String> },
    RowSetDiffers,
}

impl std::fmt::Display for MismatchReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::KeyMissingInModel => write!(f, "key missing in model results"),
            Self::KeyMissingInTruth => write!(f, "key missing in reference data"),
            Self::ValueMismatch { columns } => write!(f, "values differ: {}", columns.join(", ")),
            Self::RowSetDiffers => write!(f, "row sets differ"),
        }
    }
}

/// A non-matching key from the single-row matcher.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mismatch {
    pub key: String,
    pub reason: MismatchReason,
    pub model: Option<RowValues>,
    pub truth: Option<RowValues>,
}

/// A non-matching key from the grouped reconciler (normalized rows).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupMismatch {
    pub key: String,
    pub reason: MismatchReason,
    pub model_rows: Vec<RowValues>,
    pub truth_rows: Vec<RowValues>,
}

// ---------------------------------------------------------------------------
// Scoring outputs
// ---------------------------------------------------------------------------

/// Single-row-per-key exact comparison.
#[derive(Debug, Clone, Serialize)]
pub struct RowMatch {
    pub key_column: String,
    pub total_keys: usize,
    pub exact_matches: usize,
    pub row_accuracy: f64,
    pub columns: Vec<ColumnScore>,
    pub extra_columns: Vec<String>,
    pub mismatches: Vec<Mismatch>,
    pub skipped_rows: usize,
}

/// Multi-row-per-key set comparison.
#[derive(Debug, Clone, Serialize)]
pub struct SetMatch {
    pub key_column: String,
    pub columns: Vec<String>,
    /// Truth columns the model table lacks; not compared.
    pub missing_columns: Vec<String>,
    /// Model columns the truth table lacks; not compared.
    pub extra_columns: Vec<String>,
    pub total_keys: usize,
    pub matched_keys: usize,
    pub exact_match_rate: f64,
    pub mismatches: Vec<GroupMismatch>,
    pub skipped_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowPair {
    pub model_index: usize,
    pub truth_index: usize,
    pub distance: usize,
}

/// Greedy alignment outcome for one document key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyDistance {
    pub key: String,
    pub model_rows: usize,
    pub truth_rows: usize,
    pub total: usize,
    pub average: f64,
    pub pairs: Vec<RowPair>,
    pub unmatched_model: Vec<usize>,
    pub unmatched_truth: Vec<usize>,
}

/// Multi-row-per-key edit-distance alignment.
#[derive(Debug, Clone, Serialize)]
pub struct SimilarityMatch {
    pub key_column: String,
    pub columns: Vec<String>,
    pub missing_columns: Vec<String>,
    pub extra_columns: Vec<String>,
    pub keys: Vec<KeyDistance>,
    pub mean_distance: f64,
    pub skipped_rows: usize,
}

impl SimilarityMatch {
    pub fn key(&self, key: &str) -> Option<&KeyDistance> {
        self.keys.iter().find(|k| k.key == key)
    }
}

/// Per-column mean similarity with the count-mismatch penalty applied.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnSimilarity {
    pub columns: Vec<ColumnScore>,
    pub aligned_rows: usize,
    pub hallucinations: usize,
    pub model_rows: usize,
    pub truth_rows: usize,
    pub penalty: f64,
}

impl ColumnSimilarity {
    pub fn score(&self, column: &str) -> Option<f64> {
        score_of(&self.columns, column)
    }

    pub fn average(&self) -> Option<f64> {
        mean_score(&self.columns)
    }
}

/// Descriptive statistics over a duration column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeStats {
    pub column: String,
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

// ---------------------------------------------------------------------------
// Run output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct MetadataReport {
    pub exact: RowMatch,
    pub similarity: ColumnSimilarity,
}

#[derive(Debug, Clone, Serialize)]
pub struct MutationReport {
    pub exact: SetMatch,
    pub distance: SimilarityMatch,
    pub similarity: ColumnSimilarity,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvalMeta {
    pub config_name: String,
    pub key_column: String,
    pub threshold: f64,
    pub engine_version: String,
    pub run_at: String,
}

impl EvalMeta {
    /// Stamp a run with the engine version and the current time.
    pub fn new(config_name: &str, key_column: &str, threshold: f64) -> Self {
        Self {
            config_name: config_name.to_string(),
            key_column: key_column.to_string(),
            threshold,
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EvalResult {
    pub meta: EvalMeta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MetadataReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mutations: Option<MutationReport>,
    pub timings: Vec<TimeStats>,
}
