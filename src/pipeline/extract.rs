//! Per-source event extraction
//!
//! A column mapping names the (case id, timestamp) pair of a source and the
//! feature columns carried into the log. Mapping entries come from the log
//! mapping configuration as `{kind: [columns]}` objects.

use std::collections::BTreeMap;

use crate::error::ExtractionError;

use super::event::{RawEvent, SubLog};
use super::loader::Table;
use super::value::Value;

/// Entry kind holding the (case id, timestamp) pair
pub const DATA_KEY: &str = "event_log_data";
/// Entry kind holding feature columns
pub const FEATURES_KEY: &str = "event_log_features";

/// Resolved mapping for one source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    pub case_id: String,
    pub timestamp: String,
    pub features: Vec<String>,
}

impl ColumnMapping {
    /// Resolve raw mapping entries.
    ///
    /// The last entry whose kind contains `event_log_data` and lists exactly
    /// two columns provides the pair. Feature columns are gathered from every
    /// `event_log_features` entry in order, without duplicates.
    pub fn from_entries(
        source_name: &str,
        entries: &[BTreeMap<String, Vec<String>>],
    ) -> Result<Self, ExtractionError> {
        let mut pair = None;
        for entry in entries {
            for (kind, columns) in entry {
                if kind.contains(DATA_KEY) && columns.len() == 2 {
                    pair = Some((columns[0].clone(), columns[1].clone()));
                }
            }
        }
        let (case_id, timestamp) = pair.ok_or_else(|| ExtractionError::MissingCaseTimestampPair {
            source_name: source_name.to_string(),
        })?;

        let mut features: Vec<String> = Vec::new();
        for entry in entries {
            for (kind, columns) in entry {
                if kind.contains(FEATURES_KEY) {
                    for column in columns {
                        if !features.contains(column) {
                            features.push(column.clone());
                        }
                    }
                }
            }
        }

        Ok(Self {
            case_id,
            timestamp,
            features,
        })
    }
}

/// Per-source extraction counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionStats {
    pub rows: usize,
    pub events: usize,
    pub null_timestamps: usize,
    pub null_case_ids: usize,
}

/// Extract one event per row with a timestamp and a case identifier.
///
/// Every mapped column must exist in the table; a missing one fails the
/// source as a whole.
pub fn extract_events(
    table: &Table,
    mapping: &ColumnMapping,
) -> Result<(SubLog, ExtractionStats), ExtractionError> {
    let missing = |column: &str| ExtractionError::MissingColumn {
        source_name: table.name.clone(),
        column: column.to_string(),
    };
    let case_idx = table
        .column_index(&mapping.case_id)
        .ok_or_else(|| missing(&mapping.case_id))?;
    let ts_idx = table
        .column_index(&mapping.timestamp)
        .ok_or_else(|| missing(&mapping.timestamp))?;
    let feature_idx: Vec<(String, usize)> = mapping
        .features
        .iter()
        .map(|f| table.column_index(f).map(|i| (f.clone(), i)).ok_or_else(|| missing(f)))
        .collect::<Result<_, _>>()?;

    let event_name = table.stem().to_string();
    let mut stats = ExtractionStats {
        rows: table.height(),
        ..Default::default()
    };
    let mut events = Vec::with_capacity(table.height());

    for row in &table.rows {
        if row[ts_idx].is_null() {
            stats.null_timestamps += 1;
            continue;
        }
        let case_id = match row[case_idx].render() {
            Some(id) => id,
            None => {
                stats.null_case_ids += 1;
                continue;
            }
        };

        let attributes = feature_idx
            .iter()
            .map(|(name, idx)| (name.clone(), row[*idx].clone()))
            .collect();

        events.push(RawEvent {
            case_id,
            event_name: event_name.clone(),
            timestamp: row[ts_idx].clone(),
            attributes,
        });
    }
    stats.events = events.len();

    Ok((
        SubLog {
            source: table.name.clone(),
            features: mapping.features.clone(),
            events,
        },
        stats,
    ))
}

/// Convenience for tests and callers building events by hand
pub fn raw_event(case_id: &str, event_name: &str, timestamp: &str) -> RawEvent {
    RawEvent {
        case_id: case_id.to_string(),
        event_name: event_name.to_string(),
        timestamp: Value::from(timestamp),
        attributes: BTreeMap::new(),
    }
}
