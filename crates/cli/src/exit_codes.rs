//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Trigger                                                   |
//! |------|-----------------------------------------------------------|
//! | 0    | Success                                                   |
//! | 1    | General error (unspecified)                               |
//! | 2    | CLI usage error (bad args, out-of-range threshold)        |
//! | 3    | Config file cannot be parsed or fails validation          |
//! | 4    | A table, document or output file cannot be read/written   |
//! | 5    | `run --min-accuracy` not met                              |
//! | 6    | `check --strict` found ungrounded rows                    |

use medx_eval::EvalError;
use medx_io::LoadError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Config file unreadable as TOML, unknown keys, or failed validation.
pub const EXIT_CONFIG_INVALID: u8 = 3;

/// Input table, document directory or output file I/O failed.
pub const EXIT_LOAD_FAILED: u8 = 4;

/// An exact-match accuracy fell below `--min-accuracy`.
pub const EXIT_THRESHOLD_NOT_MET: u8 = 5;

/// `check --strict` reported at least one finding.
pub const EXIT_UNGROUNDED: u8 = 6;

/// Exit code for an engine error.
pub fn eval_exit_code(err: &EvalError) -> u8 {
    match err {
        EvalError::ConfigParse(_) | EvalError::ConfigValidation(_) => EXIT_CONFIG_INVALID,
        EvalError::MissingKeyColumn { .. } | EvalError::MissingColumn { .. } => EXIT_USAGE,
    }
}

/// Exit code for a load/write error. Every variant is an I/O-side failure.
pub fn load_exit_code(_err: &LoadError) -> u8 {
    EXIT_LOAD_FAILED
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_ERROR,
            EXIT_USAGE,
            EXIT_CONFIG_INVALID,
            EXIT_LOAD_FAILED,
            EXIT_THRESHOLD_NOT_MET,
            EXIT_UNGROUNDED,
        ];
        let mut sorted = codes.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
    }

    #[test]
    fn config_errors_map_to_config_invalid() {
        assert_eq!(eval_exit_code(&EvalError::ConfigParse("x".into())), EXIT_CONFIG_INVALID);
        assert_eq!(
            eval_exit_code(&EvalError::MissingKeyColumn { table: "model".into(), column: "id".into() }),
            EXIT_USAGE
        );
    }

    #[test]
    fn column_errors_map_to_usage() {
        let err = EvalError::MissingColumn { table: "truth".into(), column: "Mutation".into() };
        assert_eq!(eval_exit_code(&err), EXIT_USAGE);
        assert_eq!(eval_exit_code(&EvalError::ConfigValidation("x".into())), EXIT_CONFIG_INVALID);
    }
}
