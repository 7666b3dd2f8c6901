//! Statistics export: data-quality summaries and duration tables

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use crate::pipeline::{format_float, write_rows, DurationStats, TableSummary, ValueFrequency};

/// Metadata about the run that produced a summary
#[derive(Serialize)]
pub struct ExportMetadata {
    /// Timestamp of the export (ISO 8601 format)
    pub timestamp: String,
    pub tenderlog_version: String,
}

/// Data-quality summary with metadata, as written to `<stem>_stats_missing.json`
#[derive(Serialize)]
pub struct TableSummaryExport<'a> {
    pub metadata: ExportMetadata,
    #[serde(flatten)]
    pub summary: &'a TableSummary,
}

/// Write a source table's data-quality summary as pretty JSON
pub fn export_table_summary(summary: &TableSummary, output_path: &Path) -> Result<()> {
    let export = TableSummaryExport {
        metadata: ExportMetadata {
            timestamp: Utc::now().to_rfc3339(),
            tenderlog_version: env!("CARGO_PKG_VERSION").to_string(),
        },
        summary,
    };

    let json = serde_json::to_string_pretty(&export)
        .context("Failed to serialize table summary to JSON")?;

    std::fs::write(output_path, json)
        .with_context(|| format!("Failed to write table summary to {}", output_path.display()))?;

    Ok(())
}

/// Write distinct-value frequencies as `column, value, frequency_pct`
pub fn export_value_frequencies(
    frequencies: &[ValueFrequency],
    output_path: &Path,
    separator: u8,
) -> Result<()> {
    let header = ["column", "value", "frequency_pct"].map(String::from);
    let rows: Vec<Vec<Option<String>>> = frequencies
        .iter()
        .map(|f| {
            vec![
                Some(f.column.clone()),
                Some(f.value.clone()),
                Some(format_float(f.frequency_pct)),
            ]
        })
        .collect();

    write_rows(output_path, separator, &header, &rows)
}

/// Write per-category duration statistics. A missing standard deviation is
/// written as an empty field.
pub fn export_duration_stats(
    stats: &[DurationStats],
    output_path: &Path,
    separator: u8,
) -> Result<()> {
    let header = [
        "category",
        "case_count",
        "mean_duration",
        "median_duration",
        "std_dev_duration",
    ]
    .map(String::from);
    let rows: Vec<Vec<Option<String>>> = stats
        .iter()
        .map(|s| {
            vec![
                Some(s.category.clone()),
                Some(s.case_count.to_string()),
                Some(format_float(s.mean_duration)),
                Some(format_float(s.median_duration)),
                s.std_dev_duration.map(format_float),
            ]
        })
        .collect();

    write_rows(output_path, separator, &header, &rows)
}
