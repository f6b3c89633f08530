use crate::model::{Table, TimeStats};

/// Descriptive statistics over the numeric cells of `column`.
///
/// `std` is the sample standard deviation (n - 1); a single value has 0.
pub fn time_stats(table: &Table, column: &str) -> Option<TimeStats> {
    let idx = table.column_index(column)?;
    let values: Vec<f64> = table.rows.iter().filter_map(|r| r[idx].as_number()).collect();
    if values.is_empty() {
        return None;
    }

    let count = values.len();
    let mean = values.iter().sum::<f64>() / count as f64;
    let std = if count > 1 {
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
        var.sqrt()
    } else {
        0.0
    };
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Some(TimeStats { column: column.to_string(), count, mean, std, min, max })
}
