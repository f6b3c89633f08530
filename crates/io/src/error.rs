use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}: CSV parse error: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    /// calamine failed to open the workbook or read a sheet.
    #[error("{}: {message}", path.display())]
    Spreadsheet { path: PathBuf, message: String },
    #[error("{}: no header row", path.display())]
    EmptySheet { path: PathBuf },
    #[error("{}: no sheet named '{sheet}' (available: {})", path.display(), available.join(", "))]
    UnknownSheet {
        path: PathBuf,
        sheet: String,
        available: Vec<String>,
    },
    #[error("cannot write {}: {message}", path.display())]
    Write { path: PathBuf, message: String },
}
