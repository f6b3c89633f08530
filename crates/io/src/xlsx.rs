// Spreadsheet import (xlsx, xls, xlsb, ods) and report export (xlsx only)

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook};

use medx_eval::model::{CellValue, Table};

use crate::csv::header_names;
use crate::error::LoadError;

/// Maximum number of rows read from one sheet
const MAX_ROWS: usize = 1_048_576;

/// Read one worksheet as a table. The first row is the header row; `sheet`
/// selects a worksheet by name, otherwise the first one is used.
pub fn read_table(path: &Path, sheet: Option<&str>) -> Result<Table, LoadError> {
    let spreadsheet_err = |message: String| LoadError::Spreadsheet {
        path: path.to_path_buf(),
        message,
    };

    let mut workbook = open_workbook_auto(path)
        .map_err(|e| spreadsheet_err(format!("failed to open spreadsheet: {e}")))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let sheet_name = match sheet {
        Some(name) => sheet_names
            .iter()
            .find(|s| s.as_str() == name)
            .cloned()
            .ok_or_else(|| LoadError::UnknownSheet {
                path: path.to_path_buf(),
                sheet: name.to_string(),
                available: sheet_names.clone(),
            })?,
        None => sheet_names
            .first()
            .cloned()
            .ok_or_else(|| spreadsheet_err("spreadsheet contains no sheets".into()))?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| spreadsheet_err(format!("failed to read sheet '{sheet_name}': {e}")))?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Err(LoadError::EmptySheet { path: path.to_path_buf() });
    };
    let header_text: Vec<String> = header.iter().map(header_text).collect();
    let mut table = Table::new(header_names(header_text.iter().map(String::as_str)));

    for row in rows.take(MAX_ROWS) {
        let cells: Vec<CellValue> = row.iter().map(cell_value).collect();
        if cells.iter().all(CellValue::is_missing) {
            continue;
        }
        table.push_row(cells);
    }

    tracing::debug!(
        path = %path.display(),
        sheet = %sheet_name,
        rows = table.len(),
        "spreadsheet loaded"
    );
    Ok(table)
}

fn header_text(cell: &Data) -> String {
    match cell_value(cell) {
        CellValue::Missing => String::new(),
        other => other.display(),
    }
}

/// Convert a calamine cell. Typed numeric cells stay numbers; strings go
/// through the same inference as delimited text.
pub fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Missing,
        Data::String(s) => CellValue::from_input(s),
        Data::Float(n) => {
            if n.is_finite() {
                CellValue::Number(*n)
            } else {
                CellValue::Missing
            }
        }
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Bool(b) => CellValue::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::Error(e) => CellValue::Text(format!("#{e:?}")),
        // serial date number
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::from_input(s),
    }
}

/// Write a table to a single-sheet workbook with a bold, frozen header row.
pub fn write_table(table: &Table, path: &Path, sheet_name: &str) -> Result<(), LoadError> {
    let write_err = |e: rust_xlsxwriter::XlsxError| LoadError::Write {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let mut workbook = XlsxWorkbook::new();
    let header_format = Format::new().set_bold();

    let worksheet = workbook.add_worksheet().set_name(sheet_name).map_err(write_err)?;

    for (col, name) in table.columns.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, name, &header_format)
            .map_err(write_err)?;
    }

    for (row_idx, row) in table.rows.iter().enumerate() {
        let row32 = (row_idx + 1) as u32;
        for (col, cell) in row.iter().enumerate() {
            let col16 = col as u16;
            match cell {
                CellValue::Missing => {}
                CellValue::Number(n) => {
                    worksheet.write_number(row32, col16, *n).map_err(write_err)?;
                }
                CellValue::Text(s) => {
                    worksheet.write_string(row32, col16, s).map_err(write_err)?;
                }
            }
        }
    }

    worksheet.set_freeze_panes(1, 0).map_err(write_err)?;

    workbook.save(path).map_err(write_err)?;
    Ok(())
}
