use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::EvalError;

pub const DEFAULT_THRESHOLD: f64 = 0.5;
pub const DEFAULT_DISPLAY_LIMIT: usize = 5;
pub const DEFAULT_TIME_COLUMNS: &[&str] = &["Time_Metadata", "Time_Mutation"];

// ---------------------------------------------------------------------------
// Threshold
// ---------------------------------------------------------------------------

/// Reject threshold for normalized edit distance, in (0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "f64")]
pub struct Threshold(f64);

impl Threshold {
    pub fn new(value: f64) -> Result<Self, EvalError> {
        if value > 0.0 && value <= 1.0 {
            Ok(Self(value))
        } else {
            Err(EvalError::ConfigValidation(format!(
                "threshold must be in (0, 1], got {value}"
            )))
        }
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self(DEFAULT_THRESHOLD)
    }
}

impl TryFrom<f64> for Threshold {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Threshold::new(value).map_err(|e| e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvalConfig {
    pub name: String,
    pub key_column: String,
    #[serde(default)]
    pub threshold: Threshold,
    #[serde(default = "default_display_limit")]
    pub display_limit: usize,
    #[serde(default)]
    pub metadata: Option<DatasetConfig>,
    #[serde(default)]
    pub mutations: Option<MutationConfig>,
    #[serde(default)]
    pub timings: Option<TimingConfig>,
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_display_limit() -> usize {
    DEFAULT_DISPLAY_LIMIT
}

// ---------------------------------------------------------------------------
// Datasets
// ---------------------------------------------------------------------------

/// Model output file and verified reference file for one dataset.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetConfig {
    pub model: String,
    pub truth: String,
    /// Worksheet of the model workbook (first sheet when absent).
    #[serde(default)]
    pub sheet: Option<String>,
    /// Worksheet of the truth workbook (first sheet when absent).
    #[serde(default)]
    pub truth_sheet: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MutationConfig {
    pub model: String,
    pub truth: String,
    #[serde(default)]
    pub sheet: Option<String>,
    #[serde(default)]
    pub truth_sheet: Option<String>,
    /// Rows missing this field are dropped before similarity scoring.
    #[serde(default)]
    pub required_column: Option<String>,
}

impl MutationConfig {
    pub fn dataset(&self) -> DatasetConfig {
        DatasetConfig {
            model: self.model.clone(),
            truth: self.truth.clone(),
            sheet: self.sheet.clone(),
            truth_sheet: self.truth_sheet.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimingConfig {
    pub file: String,
    #[serde(default = "default_time_columns")]
    pub columns: Vec<String>,
}

fn default_time_columns() -> Vec<String> {
    DEFAULT_TIME_COLUMNS.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default)]
    pub json: Option<String>,
    #[serde(default)]
    pub mismatches: Option<String>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl EvalConfig {
    pub fn from_toml(input: &str) -> Result<Self, EvalError> {
        let config: EvalConfig =
            toml::from_str(input).map_err(|e| EvalError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EvalError> {
        if self.key_column.trim().is_empty() {
            return Err(EvalError::ConfigValidation("key_column must not be empty".into()));
        }

        if self.metadata.is_none() && self.mutations.is_none() {
            return Err(EvalError::ConfigValidation(
                "at least one of [metadata] or [mutations] is required".into(),
            ));
        }

        if let Some(ref m) = self.mutations {
            if m.required_column.as_deref() == Some(self.key_column.as_str()) {
                return Err(EvalError::ConfigValidation(
                    "mutations.required_column must differ from key_column".into(),
                ));
            }
        }

        Ok(())
    }
}

/// Resolve a config-relative path against the config file's directory.
pub fn resolve_path(config_path: &Path, file: &str) -> PathBuf {
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    base_dir.join(file)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
name = "gemma3-4b"
key_column = "Examen"
threshold = 0.4
display_limit = 10

[metadata]
model = "out/metadata.xlsx"
truth = "data/verified_metadata.csv"

[mutations]
model = "out/mutation.xlsx"
truth = "data/verified_mutations.xlsx"
sheet = "Mutations"
truth_sheet = "Verified"
required_column = "Mutation"

[timings]
file = "out/times.xlsx"

[output]
json = "out/eval.json"
mismatches = "out/mismatches.xlsx"
"#;

    #[test]
    fn parse_full_config() {
        let config = EvalConfig::from_toml(FULL).unwrap();
        assert_eq!(config.name, "gemma3-4b");
        assert_eq!(config.key_column, "Examen");
        assert_eq!(config.threshold.get(), 0.4);
        assert_eq!(config.display_limit, 10);
        let muts = config.mutations.unwrap();
        assert_eq!(muts.required_column.as_deref(), Some("Mutation"));
        let dataset = muts.dataset();
        assert_eq!(dataset.sheet.as_deref(), Some("Mutations"));
        assert_eq!(dataset.truth_sheet.as_deref(), Some("Verified"));
        assert!(config.metadata.unwrap().truth_sheet.is_none());
        assert_eq!(config.timings.unwrap().columns, vec!["Time_Metadata", "Time_Mutation"]);
        assert_eq!(config.output.mismatches.as_deref(), Some("out/mismatches.xlsx"));
    }

    #[test]
    fn defaults_apply() {
        let input = r#"
name = "minimal"
key_column = "id"

[metadata]
model = "m.csv"
truth = "t.csv"
"#;
        let config = EvalConfig::from_toml(input).unwrap();
        assert_eq!(config.threshold.get(), DEFAULT_THRESHOLD);
        assert_eq!(config.display_limit, DEFAULT_DISPLAY_LIMIT);
        assert!(config.mutations.is_none());
        assert!(config.output.json.is_none());
    }

    #[test]
    fn reject_out_of_range_threshold() {
        let input = r#"
name = "bad"
key_column = "id"
threshold = 1.5

[metadata]
model = "m.csv"
truth = "t.csv"
"#;
        let err = EvalConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("threshold must be in (0, 1]"));
    }

    #[test]
    fn reject_config_without_datasets() {
        let input = r#"
name = "empty"
key_column = "id"
"#;
        let err = EvalConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("at least one of"));
    }

    #[test]
    fn reject_unknown_keys() {
        let input = r#"
name = "typo"
key_column = "id"
treshold = 0.5

[metadata]
model = "m.csv"
truth = "t.csv"
"#;
        assert!(EvalConfig::from_toml(input).is_err());
    }

    #[test]
    fn reject_empty_key_column() {
        let input = r#"
name = "nokey"
key_column = " "

[metadata]
model = "m.csv"
truth = "t.csv"
"#;
        let err = EvalConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("key_column"));
    }

    #[test]
    fn paths_resolve_against_config_dir() {
        let p = resolve_path(Path::new("/runs/gemma/eval.toml"), "out/m.xlsx");
        assert_eq!(p, PathBuf::from("/runs/gemma/out/m.xlsx"));
    }
}
