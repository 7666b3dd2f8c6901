//! The three pipeline stages
//!
//! Each stage reads its inputs from disk, runs the pipeline functions and
//! persists its outputs. Stages share nothing in memory; Stage 2 reads the
//! Stage 1 log and Stage 3 reads the Stage 2 log.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use indicatif::ProgressBar;

use crate::config::Config;
use crate::error::ExtractionError;
use crate::pipeline::{
    assemble_log, clean_main_table, distinct_value_frequencies, duration_stats, ensure_dir,
    extract_events, filter_cases, filter_main_table, list_source_files, load_table,
    partition_log, read_reference_ids, summarize_table, AdmissibleCases, AssemblyStats,
    ColumnMapping, DurationStats, EventLog, ExtractionStats,
};
use crate::report::{export_duration_stats, export_table_summary, export_value_frequencies};

/// Case column of the main source when its mapping does not name one
const DEFAULT_CASE_COLUMN: &str = "cig";

/// What happened to one source file during Stage 1
#[derive(Debug, Clone, PartialEq)]
pub enum SourceOutcome {
    /// Events were extracted (possibly zero)
    Extracted(ExtractionStats),
    /// No mapping configured for this file
    NoMapping,
    /// The mapping could not be applied; the source contributed nothing
    Failed(ExtractionError),
}

#[derive(Debug, Clone)]
pub struct SourceReport {
    pub file_name: String,
    pub rows: usize,
    pub duplicates_dropped: usize,
    pub malformed_cells: usize,
    pub outcome: SourceOutcome,
}

/// Stage 1 result
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub sources: Vec<SourceReport>,
    /// Size of the admissible set; `None` when unrestricted
    pub admissible_cases: Option<usize>,
    pub assembly: AssemblyStats,
    pub log_path: PathBuf,
    pub case_ids_path: PathBuf,
    pub stats_files: Vec<PathBuf>,
}

impl BuildReport {
    pub fn failed_sources(&self) -> impl Iterator<Item = &SourceReport> {
        self.sources
            .iter()
            .filter(|s| matches!(s.outcome, SourceOutcome::Failed(_)))
    }
}

/// Stage 2 result
#[derive(Debug, Clone)]
pub struct FilterReport {
    pub input_events: usize,
    pub input_cases: usize,
    pub reference_ids: usize,
    pub output_events: usize,
    pub output_cases: usize,
    pub boundary_rule: bool,
    pub output_path: PathBuf,
}

/// Per-category counts of a Stage 3 split
#[derive(Debug, Clone)]
pub struct PartitionSummary {
    pub category: String,
    pub threshold: f64,
    pub above_events: usize,
    pub above_cases: usize,
    pub below_events: usize,
    pub below_cases: usize,
    pub missing_amounts: usize,
    pub above_path: PathBuf,
    pub below_path: PathBuf,
}

/// Stage 3 result
#[derive(Debug, Clone)]
pub struct PartitionReport {
    pub input_events: usize,
    pub partitions: Vec<PartitionSummary>,
    pub durations: Vec<DurationStats>,
    pub stats_path: PathBuf,
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string()
}

/// Stage 1: read every source, extract and assemble the event log.
///
/// Per-source mapping errors are reported and skipped. Cleanup and row
/// filtering problems on the main source, a main source missing while row
/// filters are configured, and timestamp parse failures abort the stage.
pub fn run_build_log(config: &Config, collect_stats: bool, progress: &ProgressBar) -> Result<BuildReport> {
    let settings = &config.settings;
    let separator = config.separator();
    let collect_stats = collect_stats || settings.collect_stats;

    ensure_dir(&settings.log_dir)?;
    if collect_stats {
        ensure_dir(&settings.stats_dir)?;
    }

    let files = list_source_files(&settings.od_dir, &settings.od_file_type)?;
    tracing::info!(
        dir = %settings.od_dir.display(),
        files = files.len(),
        "scanned open-data directory"
    );
    let main_present = files.iter().any(|p| file_name_of(p) == settings.main_file);
    if !main_present && !config.row_predicates(&settings.main_file).is_empty() {
        bail!(
            "Row filters are configured for main source {} but no such file was found in {}",
            settings.main_file,
            settings.od_dir.display()
        );
    }
    progress.set_length(files.len() as u64);

    let mut sources = Vec::with_capacity(files.len());
    let mut sublogs = Vec::new();
    let mut admissible = AdmissibleCases::Unrestricted;
    let mut stats_files = Vec::new();

    for path in &files {
        let file_name = file_name_of(path);
        progress.set_message(file_name.clone());

        let loaded = load_table(path, separator, &config.column_types)?;
        let mut table = loaded.table;
        let is_main = file_name == settings.main_file;
        let entries = config.mapping_entries(&file_name);
        let mapping = ColumnMapping::from_entries(&file_name, entries);

        if is_main {
            clean_main_table(&mut table, &config.cleanup_columns())
                .with_context(|| format!("Failed to clean main source {}", file_name))?;
        }

        // Stats describe the main table after cleanup and before row filtering
        if collect_stats {
            let stem = table.stem().to_string();
            let summary_path = settings.stats_dir.join(format!("{}_stats_missing.json", stem));
            export_table_summary(&summarize_table(&table, loaded.duplicates_dropped), &summary_path)?;
            stats_files.push(summary_path);

            let stats_columns = config.stats_columns(&file_name);
            if !stats_columns.is_empty() {
                let distinct_path = settings.stats_dir.join(format!("{}_stats_distinct.csv", stem));
                let frequencies = distinct_value_frequencies(&table, stats_columns);
                export_value_frequencies(&frequencies, &distinct_path, separator)?;
                stats_files.push(distinct_path);
            }
        }

        if is_main {
            let predicates = config.row_predicates(&file_name);
            let case_column = mapping
                .as_ref()
                .map(|m| m.case_id.clone())
                .unwrap_or_else(|_| DEFAULT_CASE_COLUMN.to_string());
            admissible = filter_main_table(&mut table, &predicates, &case_column)
                .with_context(|| format!("Failed to filter main source {}", file_name))?;
        }

        let outcome = if entries.is_empty() {
            SourceOutcome::NoMapping
        } else {
            match mapping.and_then(|m| extract_events(&table, &m)) {
                Ok((sublog, stats)) => {
                    tracing::info!(
                        source = %file_name,
                        events = stats.events,
                        null_timestamps = stats.null_timestamps,
                        null_case_ids = stats.null_case_ids,
                        "extracted events"
                    );
                    sublogs.push(sublog);
                    SourceOutcome::Extracted(stats)
                }
                Err(e) => {
                    tracing::warn!(source = %file_name, error = %e, "source skipped");
                    SourceOutcome::Failed(e)
                }
            }
        };

        sources.push(SourceReport {
            file_name,
            rows: table.height(),
            duplicates_dropped: loaded.duplicates_dropped,
            malformed_cells: loaded.malformed_cells,
            outcome,
        });
        progress.inc(1);
    }

    let admissible_cases = match &admissible {
        AdmissibleCases::Unrestricted => None,
        AdmissibleCases::Only(ids) => Some(ids.len()),
    };

    let (log, assembly) = assemble_log(sublogs, &admissible, &config.assembly_rules())?;

    let log_path = config.log_path();
    let case_ids_path = config.case_ids_path();
    log.write(&log_path, separator)?;
    log.write_case_ids(&case_ids_path, separator)?;

    Ok(BuildReport {
        sources,
        admissible_cases,
        assembly,
        log_path,
        case_ids_path,
        stats_files,
    })
}

/// Stage 2: restrict the Stage 1 log to the reference case list
pub fn run_case_filter(config: &Config) -> Result<FilterReport> {
    let settings = &config.settings;
    let separator = config.separator();

    let input_path = config.log_path();
    let log = EventLog::read(&input_path, separator, &settings.log.log_column_types)?;

    let reference_path = config.reference_path();
    let reference = read_reference_ids(
        &reference_path,
        config.reference_separator(),
        &settings.case_filter.reference_column,
    )?;
    tracing::info!(
        reference = %reference_path.display(),
        ids = reference.len(),
        "loaded reference case list"
    );

    let boundary = config.boundary_rule();
    let filtered = filter_cases(&log, &reference, boundary.as_ref());

    ensure_dir(&settings.log_dir)?;
    let output_path = config.filtered_log_path();
    filtered.write(&output_path, separator)?;

    Ok(FilterReport {
        input_events: log.len(),
        input_cases: log.case_count(),
        reference_ids: reference.len(),
        output_events: filtered.len(),
        output_cases: filtered.case_count(),
        boundary_rule: boundary.is_some(),
        output_path,
    })
}

/// Stage 3: region-restricted threshold partitions and duration statistics
pub fn run_partition(config: &Config) -> Result<PartitionReport> {
    let settings = &config.settings;
    let separator = config.separator();
    let log_settings = &settings.log;

    let input_path = config.filtered_log_path();
    let log = EventLog::read(&input_path, separator, &log_settings.log_column_types)?;

    ensure_dir(&settings.log_dir)?;

    let partitions = partition_log(
        &log,
        &settings.partition.thresholds,
        &config.region_filter(),
        &log_settings.region_attribute,
        &log_settings.amount_attribute,
    );

    let mut summaries = Vec::with_capacity(partitions.len());
    for partition in &partitions {
        let (above_path, below_path) = config.partition_paths(&partition.category.name);
        partition.above.write(&above_path, separator)?;
        partition.below.write(&below_path, separator)?;
        tracing::info!(
            category = %partition.category.name,
            above = partition.above.len(),
            below = partition.below.len(),
            "partition written"
        );

        summaries.push(PartitionSummary {
            category: partition.category.name.clone(),
            threshold: partition.category.threshold,
            above_events: partition.above.len(),
            above_cases: partition.above.case_count(),
            below_events: partition.below.len(),
            below_cases: partition.below.case_count(),
            missing_amounts: partition.missing_amounts,
            above_path,
            below_path,
        });
    }

    let durations = duration_stats(&log, &log_settings.contract_type_attribute);
    let stats_path = config.duration_stats_path();
    export_duration_stats(&durations, &stats_path, separator)?;

    Ok(PartitionReport {
        input_events: log.len(),
        partitions: summaries,
        durations,
        stats_path,
    })
}
