// Delimited text import/export

use std::io::Read;
use std::path::Path;

use medx_eval::model::{CellValue, Table};

use crate::error::LoadError;

pub fn read_table(path: &Path) -> Result<Table, LoadError> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content);
    parse_table(&content, delimiter).map_err(|source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    })
}

/// Guess the field delimiter from the first ten non-empty lines.
///
/// Reference exports use `;`, model outputs use `,`. A candidate scores the
/// number of lines whose field count equals the header's, times that count;
/// single-field splits never win. Falls back to `,`.
pub fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().filter(|l| !l.is_empty()).take(10).collect();

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        let Some(&target) = counts.first() else { continue };
        if target <= 1 {
            continue;
        }

        // lines agreeing with the header, weighted by field count
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read file and convert to UTF-8 if needed (Excel exports are often Windows-1252).
pub fn read_file_as_utf8(path: &Path) -> Result<String, LoadError> {
    let io_err = |source| LoadError::Io { path: path.to_path_buf(), source };
    let mut file = std::fs::File::open(path).map_err(io_err)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(io_err)?;

    let text = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            tracing::debug!(path = %path.display(), "decoded as Windows-1252");
            decoded.into_owned()
        }
    };

    Ok(match text.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => text,
    })
}

/// Parse delimited text whose first record is the header row.
pub fn parse_table(content: &str, delimiter: u8) -> Result<Table, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut records = reader.records();
    let header = match records.next() {
        Some(record) => record?,
        None => return Ok(Table::default()),
    };
    let mut table = Table::new(header_names(header.iter()));

    for result in records {
        let record = result?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        table.push_row(record.iter().map(CellValue::from_input).collect());
    }

    Ok(table)
}

/// Header names with blanks replaced by `column_<n>` (1-based).
pub fn header_names<'a>(fields: impl Iterator<Item = &'a str>) -> Vec<String> {
    fields
        .enumerate()
        .map(|(i, name)| {
            let name = name.trim();
            if name.is_empty() {
                format!("column_{}", i + 1)
            } else {
                name.to_string()
            }
        })
        .collect()
}

pub fn write_table(table: &Table, path: &Path) -> Result<(), LoadError> {
    let write_err = |e: csv::Error| LoadError::Write {
        path: path.to_path_buf(),
        message: e.to_string(),
    };
    let mut writer = csv::WriterBuilder::new().from_path(path).map_err(write_err)?;

    writer.write_record(&table.columns).map_err(write_err)?;
    for row in &table.rows {
        writer
            .write_record(row.iter().map(CellValue::display))
            .map_err(write_err)?;
    }

    writer.flush().map_err(|e| LoadError::Write {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(())
}
