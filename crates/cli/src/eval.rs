//! `medx run`, `validate`, `metadata`, `mutations`: scoring commands.

use std::path::{Path, PathBuf};

use clap::Args;
use medx_eval::config::{resolve_path, DatasetConfig, DEFAULT_DISPLAY_LIMIT};
use medx_eval::engine::{evaluate_metadata, evaluate_mutations};
use medx_eval::model::{EvalMeta, EvalResult, TablePair};
use medx_eval::report::{mismatch_table, render_text};
use medx_eval::similarity::SimilarityOptions;
use medx_eval::{EvalConfig, EvalInput, Threshold};
use medx_io::{load_table, write_table};

use crate::exit_codes::{EXIT_CONFIG_INVALID, EXIT_ERROR, EXIT_THRESHOLD_NOT_MET};
use crate::CliError;

/// Arguments shared by the single-dataset commands.
#[derive(Args)]
pub struct DatasetArgs {
    /// Model output table (.xlsx, .xls, .ods or delimited text)
    pub model: PathBuf,

    /// Verified reference table
    pub truth: PathBuf,

    /// Document key column
    #[arg(long, value_name = "COL")]
    pub key: String,

    /// Worksheet of the model workbook
    #[arg(long)]
    pub sheet: Option<String>,

    /// Worksheet of the truth workbook
    #[arg(long)]
    pub truth_sheet: Option<String>,

    /// Reject threshold for normalized edit distance, in (0, 1]
    #[arg(long, value_name = "F")]
    pub threshold: Option<f64>,

    /// Number of mismatches shown in the summary
    #[arg(long, value_name = "N", default_value_t = DEFAULT_DISPLAY_LIMIT)]
    pub limit: usize,

    /// Output JSON to stdout
    #[arg(long)]
    pub json: bool,

    /// Write every mismatch to a file (.xlsx or CSV)
    #[arg(long, value_name = "FILE")]
    pub mismatches: Option<PathBuf>,
}

impl DatasetArgs {
    fn threshold(&self) -> Result<f64, CliError> {
        match self.threshold {
            Some(t) => Threshold::new(t)
                .map(Threshold::get)
                .map_err(|e| CliError::args(e.to_string())),
            None => Ok(Threshold::default().get()),
        }
    }

    fn load_pair(&self) -> Result<TablePair, CliError> {
        Ok(TablePair {
            model: load_table(&self.model, self.sheet.as_deref())?,
            truth: load_table(&self.truth, self.truth_sheet.as_deref())?,
        })
    }
}

// ============================================================================
// run
// ============================================================================

fn read_config(config_path: &Path) -> Result<EvalConfig, CliError> {
    let config_str = std::fs::read_to_string(config_path)
        .map_err(|e| CliError::new(EXIT_CONFIG_INVALID, format!("cannot read config: {e}")))?;
    Ok(EvalConfig::from_toml(&config_str)?)
}

/// Load every table the config names, paths relative to the config file.
fn load_input(config_path: &Path, config: &EvalConfig) -> Result<EvalInput, CliError> {
    let load_pair = |d: &DatasetConfig| -> Result<TablePair, CliError> {
        Ok(TablePair {
            model: load_table(&resolve_path(config_path, &d.model), d.sheet.as_deref())?,
            truth: load_table(&resolve_path(config_path, &d.truth), d.truth_sheet.as_deref())?,
        })
    };

    let metadata = match &config.metadata {
        Some(d) => Some(load_pair(d)?),
        None => None,
    };
    let mutations = match &config.mutations {
        Some(m) => Some(load_pair(&m.dataset())?),
        None => None,
    };
    let timings = match &config.timings {
        Some(t) => Some(load_table(&resolve_path(config_path, &t.file), None)?),
        None => None,
    };

    Ok(EvalInput { metadata, mutations, timings })
}

pub fn cmd_run(
    config_path: PathBuf,
    json_output: bool,
    output_file: Option<PathBuf>,
    min_accuracy: Option<f64>,
) -> Result<(), CliError> {
    let config = read_config(&config_path)?;
    let input = load_input(&config_path, &config)?;
    let result = medx_eval::run(&config, &input)?;

    let json_path = output_file.or_else(|| config.output.json.as_ref().map(|p| resolve_path(&config_path, p)));
    let mismatch_path = config.output.mismatches.as_ref().map(|p| resolve_path(&config_path, p));
    emit(&result, config.display_limit, json_output, json_path.as_deref(), mismatch_path.as_deref())?;

    if let Some(min) = min_accuracy {
        check_min_accuracy(&result, min)?;
    }
    Ok(())
}

/// Fail when the metadata row accuracy or the mutation exact-match rate is below `min`.
fn check_min_accuracy(result: &EvalResult, min: f64) -> Result<(), CliError> {
    let mut scores = Vec::new();
    if let Some(ref m) = result.metadata {
        scores.push(("metadata", m.exact.row_accuracy));
    }
    if let Some(ref m) = result.mutations {
        scores.push(("mutations", m.exact.exact_match_rate));
    }

    let failing: Vec<String> = scores
        .iter()
        .filter(|(_, score)| *score < min)
        .map(|(name, score)| format!("{name} {score:.3}"))
        .collect();
    if failing.is_empty() {
        return Ok(());
    }
    Err(CliError::new(
        EXIT_THRESHOLD_NOT_MET,
        format!("accuracy below {min}: {}", failing.join(", ")),
    ))
}

// ============================================================================
// validate
// ============================================================================

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = read_config(&config_path)?;

    let mut datasets = Vec::new();
    if config.metadata.is_some() {
        datasets.push("metadata");
    }
    if config.mutations.is_some() {
        datasets.push("mutations");
    }
    if config.timings.is_some() {
        datasets.push("timings");
    }

    eprintln!(
        "config '{}' is valid: key column '{}', threshold {}, datasets: {}",
        config.name,
        config.key_column,
        config.threshold.get(),
        datasets.join(", "),
    );
    Ok(())
}

// ============================================================================
// metadata / mutations
// ============================================================================

pub fn cmd_metadata(args: DatasetArgs) -> Result<(), CliError> {
    let threshold = args.threshold()?;
    let pair = args.load_pair()?;
    let report = evaluate_metadata(&pair, &args.key, threshold)?;

    let result = EvalResult {
        meta: EvalMeta::new("metadata", &args.key, threshold),
        metadata: Some(report),
        mutations: None,
        timings: Vec::new(),
    };
    emit(&result, args.limit, args.json, None, args.mismatches.as_deref())
}

pub fn cmd_mutations(args: DatasetArgs, required: Option<String>) -> Result<(), CliError> {
    let threshold = args.threshold()?;
    if required.as_deref() == Some(args.key.as_str()) {
        return Err(CliError::args("--required must differ from --key"));
    }
    let pair = args.load_pair()?;
    let options = SimilarityOptions { required_column: required, threshold };
    let report = evaluate_mutations(&pair, &args.key, &options)?;

    let result = EvalResult {
        meta: EvalMeta::new("mutations", &args.key, threshold),
        metadata: None,
        mutations: Some(report),
        timings: Vec::new(),
    };
    emit(&result, args.limit, args.json, None, args.mismatches.as_deref())
}

// ============================================================================
// Output
// ============================================================================

/// Human summary to stderr, JSON to stdout and/or a file, mismatch table to a file.
fn emit(
    result: &EvalResult,
    display_limit: usize,
    json_output: bool,
    json_path: Option<&Path>,
    mismatch_path: Option<&Path>,
) -> Result<(), CliError> {
    eprint!("{}", render_text(result, display_limit));

    if json_output || json_path.is_some() {
        let json_str = serde_json::to_string_pretty(result)
            .map_err(|e| CliError::new(EXIT_ERROR, format!("JSON serialization error: {e}")))?;
        if let Some(path) = json_path {
            std::fs::write(path, &json_str)
                .map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display())))?;
            eprintln!("wrote {}", path.display());
        }
        if json_output {
            println!("{json_str}");
        }
    }

    if let Some(path) = mismatch_path {
        write_table(&mismatch_table(result), path)?;
        eprintln!("wrote {}", path.display());
    }

    Ok(())
}
