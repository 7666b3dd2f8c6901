//! Case membership filter
//!
//! Restricts a log to an externally supplied reference list of case
//! identifiers. An optional boundary rule keeps only cases that open and
//! close with designated events.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};

use super::event::EventLog;
use super::loader::load_table;
use super::value::ColumnType;

/// Keep cases whose first event is `opening` and last event is `closing`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryRule {
    pub opening: String,
    pub closing: String,
}

/// Read the reference case identifiers from `column` of a delimited file
pub fn read_reference_ids(path: &Path, separator: u8, column: &str) -> Result<HashSet<String>> {
    let mut types = BTreeMap::new();
    types.insert(column.to_string(), ColumnType::String);
    let loaded = load_table(path, separator, &types)
        .with_context(|| format!("Failed to read reference list: {}", path.display()))?;
    let table = loaded.table;

    let idx = table.column_index(column).with_context(|| {
        format!(
            "Reference list {} has no column '{}' (found: {:?})",
            path.display(),
            column,
            table.columns
        )
    })?;

    Ok(table
        .rows
        .iter()
        .filter_map(|row| row[idx].render())
        .collect())
}

/// Keep events whose case is in `reference`, sorted by (case_id, timestamp)
pub fn filter_by_reference(log: &EventLog, reference: &HashSet<String>) -> EventLog {
    let events = log
        .events
        .iter()
        .filter(|e| reference.contains(&e.case_id))
        .cloned()
        .collect();
    let mut filtered = log.with_events(events);
    filtered.sort_by_case_and_time();
    filtered
}

/// Keep cases whose chronological first and last events match the rule
pub fn filter_by_boundaries(log: &EventLog, rule: &BoundaryRule) -> EventLog {
    let mut filtered = log.clone();
    filtered.sort_by_case_and_time();
    filtered.retain_cases(|case| {
        let first = &case[0];
        let last = &case[case.len() - 1];
        first.event_name == rule.opening && last.event_name == rule.closing
    });
    filtered
}

/// Stage 2 core: optional boundary rule, then the reference list
pub fn filter_cases(
    log: &EventLog,
    reference: &HashSet<String>,
    boundary: Option<&BoundaryRule>,
) -> EventLog {
    match boundary {
        Some(rule) => {
            let bounded = filter_by_boundaries(log, rule);
            tracing::info!(
                cases_before = log.case_count(),
                cases_after = bounded.case_count(),
                "boundary rule applied"
            );
            filter_by_reference(&bounded, reference)
        }
        None => filter_by_reference(log, reference),
    }
}
