//! Delimited file reader and writer
//!
//! Files are read through polars with every column as text, then resolved
//! into typed [`Value`]s using the configured column-type map. Output goes
//! back through polars' CSV writer with minimal quoting.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use polars::prelude::*;

use super::value::{ColumnType, Value};

/// An in-memory source table with typed cells, row-major
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    /// File name the table was read from (e.g. `tender_notice.csv`)
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows,
        }
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Cell accessor; `None` when the column does not exist
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// File name without extension, used as the event name
    pub fn stem(&self) -> &str {
        Path::new(&self.name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.name)
    }

    /// Replace a column's values, appending the column if it does not exist
    pub fn set_column(&mut self, column: &str, values: Vec<Value>) {
        debug_assert_eq!(values.len(), self.rows.len());
        match self.column_index(column) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.columns.push(column.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
    }
}

/// Result of loading one delimited file
#[derive(Debug)]
pub struct LoadedTable {
    pub table: Table,
    /// Exact duplicate rows removed while reading
    pub duplicates_dropped: usize,
    /// Cells that did not parse as their declared type and were set to null
    pub malformed_cells: usize,
}

/// Read a delimited source file into a typed [`Table`].
///
/// Columns missing from `column_types` are read as strings. Exact duplicate
/// rows are dropped, keeping the first occurrence.
pub fn load_table(
    path: &Path,
    separator: u8,
    column_types: &BTreeMap<String, ColumnType>,
) -> Result<LoadedTable> {
    read_table(path, separator, column_types, true)
}

/// Like [`load_table`], with duplicate removal optional. Persisted event logs
/// are read without it since identical events are legitimate there.
pub fn read_table(
    path: &Path,
    separator: u8,
    column_types: &BTreeMap<String, ColumnType>,
    drop_duplicates: bool,
) -> Result<LoadedTable> {
    let df = LazyCsvReader::new(path)
        .with_separator(separator)
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .finish()
        .with_context(|| format!("Failed to load CSV file: {}", path.display()))?
        .collect()
        .with_context(|| format!("Failed to read CSV file: {}", path.display()))?;

    let columns: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    let mut raw_columns: Vec<Vec<Option<String>>> = Vec::with_capacity(columns.len());
    for name in &columns {
        let column = df.column(name)?;
        let values = column
            .str()
            .with_context(|| format!("Column '{}' was not read as text", name))?
            .into_iter()
            .map(|v| v.map(|s| s.to_string()))
            .collect();
        raw_columns.push(values);
    }

    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();

    Ok(build_table(
        name,
        columns,
        raw_columns,
        column_types,
        drop_duplicates,
    ))
}

fn build_table(
    name: String,
    columns: Vec<String>,
    raw_columns: Vec<Vec<Option<String>>>,
    column_types: &BTreeMap<String, ColumnType>,
    drop_duplicates: bool,
) -> LoadedTable {
    let height = raw_columns.first().map(|c| c.len()).unwrap_or(0);
    let types: Vec<ColumnType> = columns
        .iter()
        .map(|c| column_types.get(c).copied().unwrap_or_default())
        .collect();

    let mut seen: HashSet<Vec<Option<&str>>> = HashSet::with_capacity(height);
    let mut rows = Vec::with_capacity(height);
    let mut duplicates_dropped = 0;
    let mut malformed_cells = 0;

    for row_idx in 0..height {
        let raw_row: Vec<Option<&str>> = raw_columns
            .iter()
            .map(|col| col[row_idx].as_deref())
            .collect();
        if drop_duplicates && !seen.insert(raw_row.clone()) {
            duplicates_dropped += 1;
            continue;
        }

        let row = raw_row
            .iter()
            .zip(&types)
            .map(|(raw, ty)| {
                Value::parse(*raw, *ty).unwrap_or_else(|| {
                    malformed_cells += 1;
                    malformed_value(*raw, *ty)
                })
            })
            .collect();
        rows.push(row);
    }

    if malformed_cells > 0 {
        tracing::warn!(
            table = %name,
            malformed_cells,
            "cells not matching their declared type were read as null (dates keep their text)"
        );
    }

    LoadedTable {
        table: Table::new(name, columns, rows),
        duplicates_dropped,
        malformed_cells,
    }
}

/// Replacement for a cell that did not parse as its declared type.
///
/// Numbers become null. Dates keep their raw text: a date column may hold
/// event timestamps, and an unparseable timestamp must reach log assembly
/// rather than pass as a missing one.
fn malformed_value(raw: Option<&str>, column_type: ColumnType) -> Value {
    match (column_type, raw) {
        (ColumnType::Date, Some(text)) => Value::Str(text.to_string()),
        _ => Value::Null,
    }
}

/// Write rendered rows as a delimited file with minimal quoting.
/// `None` cells are written as empty fields.
pub fn write_rows(
    path: &Path,
    separator: u8,
    header: &[String],
    rows: &[Vec<Option<String>>],
) -> Result<()> {
    let columns: Vec<Column> = header
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let values: Vec<Option<String>> = rows.iter().map(|r| r[idx].clone()).collect();
            Column::new(name.as_str().into(), values)
        })
        .collect();
    let mut df = DataFrame::new(columns)
        .with_context(|| format!("Failed to assemble output table for {}", path.display()))?;

    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(separator)
        .with_quote_style(QuoteStyle::Necessary)
        .finish(&mut df)
        .with_context(|| format!("Failed to write CSV file: {}", path.display()))?;

    Ok(())
}

/// List files in `dir` with the given extension, skipping macOS resource
/// forks (`._*`). Names are returned sorted.
pub fn list_source_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let extension = extension.trim_start_matches('.').to_lowercase();
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to scan directory: {}", dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if file_name.starts_with("._") {
            continue;
        }
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase() == extension)
            .unwrap_or(false);
        if matches {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Create a directory (and parents) if it does not exist yet
pub fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        tracing::info!(dir = %dir.display(), "created output directory");
    }
    Ok(())
}
