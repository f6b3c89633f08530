use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvalError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (bad threshold, no dataset section, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// The designated document key column is absent from a table.
    #[error("{table} table: missing key column '{column}'")]
    MissingKeyColumn { table: String, column: String },
    /// A column required by the operation is absent from a table.
    #[error("{table} table: missing column '{column}'")]
    MissingColumn { table: String, column: String },
}
