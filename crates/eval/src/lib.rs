//! `medx-eval`: Scoring engine for extracted report data.
//!
//! Pure engine crate: receives pre-loaded tables, returns scores and
//! mismatch reports. No CLI or file IO dependencies.

pub mod config;
pub mod distance;
pub mod engine;
pub mod error;
pub mod grounding;
pub mod inspect;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod reconcile;
pub mod report;
pub mod similarity;
pub mod stats;

pub use config::{EvalConfig, Threshold};
pub use engine::run;
pub use error::EvalError;
pub use model::{CellValue, EvalInput, EvalResult, Table, TablePair};
