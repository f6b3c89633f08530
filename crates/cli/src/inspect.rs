//! `medx inspect` and `medx times`: single-document and timing views.

use std::path::PathBuf;

use medx_eval::config::DEFAULT_TIME_COLUMNS;
use medx_eval::engine::timing_stats;
use medx_eval::inspect::inspect_document;
use medx_eval::model::Table;
use medx_eval::report::render_time_stats;
use medx_io::load_table;

use crate::CliError;

pub fn cmd_inspect(
    doc: String,
    key: String,
    metadata: Option<Vec<PathBuf>>,
    mutations: Option<Vec<PathBuf>>,
) -> Result<(), CliError> {
    let mut loaded: Vec<(&str, Table, Table)> = Vec::new();
    for (label, files) in [("metadata", metadata), ("mutations", mutations)] {
        let Some(files) = files else { continue };
        let [model, truth] = files.as_slice() else {
            return Err(CliError::args(format!("--{label} takes a model file and a truth file")));
        };
        loaded.push((label, load_table(model, None)?, load_table(truth, None)?));
    }

    if loaded.is_empty() {
        return Err(CliError::args("nothing to inspect").with_hint("pass --metadata and/or --mutations"));
    }

    let datasets: Vec<(&str, &Table, &Table)> =
        loaded.iter().map(|(label, model, truth)| (*label, model, truth)).collect();
    let view = inspect_document(&doc, &datasets, &key)?;

    print!("{}", view.render());
    if !view.is_complete() {
        eprintln!("{doc} is missing from at least one table");
    }
    Ok(())
}

pub fn cmd_times(file: PathBuf, columns: Vec<String>) -> Result<(), CliError> {
    let table = load_table(&file, None)?;
    let columns: Vec<String> = if columns.is_empty() {
        DEFAULT_TIME_COLUMNS.iter().map(|c| c.to_string()).collect()
    } else {
        columns
    };

    let stats = timing_stats(&table, &columns);
    if stats.is_empty() {
        return Err(CliError::args(format!(
            "no numeric values in column(s): {}",
            columns.join(", ")
        ))
        .with_hint(format!("available columns: {}", table.columns.join(", "))));
    }

    let mut out = String::new();
    for s in &stats {
        render_time_stats(&mut out, s);
    }
    print!("{out}");
    Ok(())
}
