// medx - score extracted report data against verified references

mod check;
mod eval;
mod exit_codes;
mod inspect;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use exit_codes::{eval_exit_code, load_exit_code, EXIT_LOAD_FAILED, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "medx")]
#[command(about = "Score model-extracted report data against verified reference tables")]
#[command(version)]
struct Cli {
    /// More log output on stderr (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an evaluation from a TOML config file
    #[command(after_help = "\
Examples:
  medx run eval.toml
  medx run eval.toml --json
  medx run eval.toml --output result.json --min-accuracy 0.8")]
    Run {
        /// Path to the evaluation config
        config: PathBuf,

        /// Output JSON to stdout instead of only the human summary
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Fail (exit 5) when an exact-match accuracy is below this value
        #[arg(long, value_name = "F")]
        min_accuracy: Option<f64>,
    },

    /// Validate an evaluation config without running it
    Validate {
        /// Path to the evaluation config
        config: PathBuf,
    },

    /// Score one-row-per-document tables (exact match and similarity)
    #[command(after_help = "\
Examples:
  medx metadata out/metadata.xlsx data/verified_metadata.csv --key Examen
  medx metadata model.csv truth.csv --key Examen --mismatches mismatches.xlsx")]
    Metadata {
        #[command(flatten)]
        args: eval::DatasetArgs,
    },

    /// Score many-rows-per-document tables (set match, alignment, similarity)
    #[command(after_help = "\
Examples:
  medx mutations out/mutation.xlsx data/verified_mutations.csv --key Examen --required Mutation")]
    Mutations {
        #[command(flatten)]
        args: eval::DatasetArgs,

        /// Drop rows where this column is empty before similarity scoring
        #[arg(long, value_name = "COL")]
        required: Option<String>,
    },

    /// Show every row of one document side by side
    #[command(after_help = "\
Examples:
  medx inspect 25EM00024 --key Examen --metadata m.xlsx t.csv --mutations m2.xlsx t2.csv")]
    Inspect {
        /// Document key to look up
        doc: String,

        /// Key column name
        #[arg(long, value_name = "COL")]
        key: String,

        /// Metadata model and truth files
        #[arg(long, num_args = 2, value_names = ["MODEL", "TRUTH"])]
        metadata: Option<Vec<PathBuf>>,

        /// Mutation model and truth files
        #[arg(long, num_args = 2, value_names = ["MODEL", "TRUTH"])]
        mutations: Option<Vec<PathBuf>>,
    },

    /// Summarize processing-time columns
    Times {
        /// Table holding the timing columns
        file: PathBuf,

        /// Column to summarize (repeatable; default Time_Metadata and Time_Mutation)
        #[arg(long, value_name = "C")]
        column: Vec<String>,
    },

    /// Flag extracted values that do not occur in the source documents
    #[command(after_help = "\
Examples:
  medx check out/mutation.xlsx --key Examen --docs reports/ --value Mutation
  medx check out/mutation.xlsx --key Examen --docs reports/ --value Mutation --output findings.csv --strict")]
    Check {
        /// Model output table
        table: PathBuf,

        /// Key column name
        #[arg(long, value_name = "COL")]
        key: String,

        /// Directory holding <key>.txt documents
        #[arg(long, value_name = "DIR")]
        docs: PathBuf,

        /// Column whose values must appear in the document
        #[arg(long, value_name = "COL")]
        value: Option<String>,

        /// Write findings to a file (.xlsx or CSV)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Exit 6 when any finding is reported
        #[arg(long)]
        strict: bool,
    },
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Run { config, json, output, min_accuracy } => {
            eval::cmd_run(config, json, output, min_accuracy)
        }
        Commands::Validate { config } => eval::cmd_validate(config),
        Commands::Metadata { args } => eval::cmd_metadata(args),
        Commands::Mutations { args, required } => eval::cmd_mutations(args, required),
        Commands::Inspect { doc, key, metadata, mutations } => {
            inspect::cmd_inspect(doc, key, metadata, mutations)
        }
        Commands::Times { file, column } => inspect::cmd_times(file, column),
        Commands::Check { table, key, docs, value, output, strict } => {
            check::cmd_check(table, key, docs, value, output, strict)
        }
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn args(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::new(EXIT_LOAD_FAILED, msg)
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<medx_eval::EvalError> for CliError {
    fn from(err: medx_eval::EvalError) -> Self {
        let hint = match &err {
            medx_eval::EvalError::MissingKeyColumn { .. } => {
                Some("check the key column name; it must match the header in both tables".to_string())
            }
            _ => None,
        };
        Self { code: eval_exit_code(&err), message: err.to_string(), hint }
    }
}

impl From<medx_io::LoadError> for CliError {
    fn from(err: medx_io::LoadError) -> Self {
        let hint = match &err {
            medx_io::LoadError::UnknownSheet { .. } => Some("pass --sheet/--truth-sheet or set `sheet`/`truth_sheet` in the config".to_string()),
            _ => None,
        };
        Self { code: load_exit_code(&err), message: err.to_string(), hint }
    }
}
