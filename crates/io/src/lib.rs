// Table loading and report writing

pub mod csv;
pub mod docs;
pub mod error;
pub mod xlsx;

use std::path::Path;

use medx_eval::model::Table;

pub use docs::TextDirSource;
pub use error::LoadError;

const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "xlsb", "ods"];

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default()
}

pub fn is_spreadsheet(path: &Path) -> bool {
    SPREADSHEET_EXTENSIONS.contains(&extension(path).as_str())
}

/// Load a table from a spreadsheet or delimited text file, chosen by extension.
/// `sheet` only applies to spreadsheets.
pub fn load_table(path: &Path, sheet: Option<&str>) -> Result<Table, LoadError> {
    let table = if is_spreadsheet(path) {
        xlsx::read_table(path, sheet)?
    } else {
        csv::read_table(path)?
    };
    tracing::info!(
        path = %path.display(),
        rows = table.len(),
        columns = table.columns.len(),
        "table loaded"
    );
    Ok(table)
}

/// Write a table as XLSX when the path ends in `.xlsx`, CSV otherwise.
pub fn write_table(table: &Table, path: &Path) -> Result<(), LoadError> {
    if extension(path) == "xlsx" {
        xlsx::write_table(table, path, "Sheet1")?;
    } else {
        csv::write_table(table, path)?;
    }
    tracing::info!(path = %path.display(), rows = table.len(), "table written");
    Ok(())
}
