//! Missing value and distinct value statistics for source tables

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use super::loader::Table;

/// Data-quality summary of one source table
#[derive(Debug, Clone, Serialize)]
pub struct TableSummary {
    pub file_name: String,
    pub rows_num: usize,
    pub cols_num: usize,
    /// Null count per column
    pub missing_values: BTreeMap<String, usize>,
    /// Exact duplicates dropped while reading
    pub duplicated_rows: usize,
    pub duplicated_rows_perc: f64,
}

/// Relative frequency of one value within a column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueFrequency {
    pub column: String,
    pub value: String,
    pub frequency_pct: f64,
}

/// Count nulls per column of a table, in column order
pub fn analyze_missing_values(table: &Table) -> Vec<(String, usize)> {
    table
        .columns
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let nulls = table.rows.iter().filter(|r| r[idx].is_null()).count();
            (name.clone(), nulls)
        })
        .collect()
}

/// Build the summary; `duplicates_dropped` comes from the loader
pub fn summarize_table(table: &Table, duplicates_dropped: usize) -> TableSummary {
    let read_rows = table.height() + duplicates_dropped;
    let ratio = if read_rows > 0 {
        duplicates_dropped as f64 / read_rows as f64
    } else {
        0.0
    };

    TableSummary {
        file_name: table.name.clone(),
        rows_num: table.height(),
        cols_num: table.width(),
        missing_values: analyze_missing_values(table).into_iter().collect(),
        duplicated_rows: duplicates_dropped,
        duplicated_rows_perc: (ratio * 100.0).round() / 100.0,
    }
}

/// Percent frequency of each non-null value in the given columns.
///
/// Columns not present in the table are skipped. Within a column, values are
/// ordered by descending frequency, ties by value.
pub fn distinct_value_frequencies(table: &Table, columns: &[String]) -> Vec<ValueFrequency> {
    let mut result = Vec::new();

    for column in columns {
        let Some(idx) = table.column_index(column) else {
            tracing::warn!(table = %table.name, column = %column, "stats column not in table");
            continue;
        };

        let mut counts: HashMap<String, usize> = HashMap::new();
        let mut total = 0usize;
        for row in &table.rows {
            if let Some(value) = row[idx].render() {
                *counts.entry(value).or_insert(0) += 1;
                total += 1;
            }
        }

        let mut entries: Vec<(String, usize)> = counts.into_iter().collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        for (value, count) in entries {
            let pct = count as f64 / total as f64 * 100.0;
            result.push(ValueFrequency {
                column: column.clone(),
                value,
                frequency_pct: (pct * 100.0).round() / 100.0,
            });
        }
    }

    result
}
