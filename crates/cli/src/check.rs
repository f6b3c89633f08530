//! `medx check`: flag extracted values absent from their source document.

use std::path::PathBuf;

use medx_eval::grounding::check_grounding;
use medx_eval::model::{CellValue, Table};
use medx_io::{load_table, write_table, TextDirSource};

use crate::exit_codes::EXIT_UNGROUNDED;
use crate::CliError;

pub fn cmd_check(
    table_path: PathBuf,
    key: String,
    docs: PathBuf,
    value: Option<String>,
    output: Option<PathBuf>,
    strict: bool,
) -> Result<(), CliError> {
    if !docs.is_dir() {
        return Err(CliError::io(format!("{} is not a directory", docs.display())));
    }

    let table = load_table(&table_path, None)?;
    let source = TextDirSource::new(&docs);
    let findings = check_grounding(&table, &key, value.as_deref(), &source)?;

    let mut report = Table::new(vec!["key".into(), "value".into(), "status".into()]);
    for f in &findings {
        println!("{}\t{}\t{}", f.key, f.value.as_deref().unwrap_or(""), f.status);
        report.push_row(vec![
            CellValue::Text(f.key.clone()),
            f.value.clone().map(CellValue::Text).unwrap_or_default(),
            CellValue::Text(f.status.to_string()),
        ]);
    }

    if let Some(ref path) = output {
        write_table(&report, path)?;
        eprintln!("wrote {}", path.display());
    }

    eprintln!("{} finding(s) in {} rows", findings.len(), table.len());

    if strict && !findings.is_empty() {
        return Err(CliError::new(EXIT_UNGROUNDED, format!("{} ungrounded row(s)", findings.len())));
    }
    Ok(())
}
