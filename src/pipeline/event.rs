//! Events, event logs and the persisted log format

use std::collections::{BTreeMap, HashSet};
use std::ops::Range;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;

use super::loader::{read_table, write_rows};
use super::value::{format_timestamp, parse_timestamp, ColumnType, Value};
use crate::error::PipelineError;

pub const CASE_ID: &str = "case_id";
pub const EVENT_NAME: &str = "event_name";
pub const EVENT_TIMESTAMP: &str = "event_timestamp";
pub const CASE_LEN: &str = "case_len";

/// An event straight out of extraction, timestamp not yet parsed
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    pub case_id: String,
    pub event_name: String,
    pub timestamp: Value,
    pub attributes: BTreeMap<String, Value>,
}

/// Events extracted from one source, with the feature columns it declared
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubLog {
    pub source: String,
    pub features: Vec<String>,
    pub events: Vec<RawEvent>,
}

/// A timestamped event of an assembled log
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub case_id: String,
    pub event_name: String,
    pub timestamp: NaiveDateTime,
    pub attributes: BTreeMap<String, Value>,
    /// Number of events in the case, set once the log is assembled
    pub case_len: Option<usize>,
}

impl Event {
    pub fn attribute(&self, name: &str) -> &Value {
        static NULL: Value = Value::Null;
        self.attributes.get(name).unwrap_or(&NULL)
    }
}

/// Ordered events across all cases plus the declared attribute columns
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventLog {
    /// Attribute columns in output order
    pub attributes: Vec<String>,
    pub events: Vec<Event>,
}

impl EventLog {
    pub fn new(attributes: Vec<String>, events: Vec<Event>) -> Self {
        Self { attributes, events }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn case_count(&self) -> usize {
        self.events
            .iter()
            .map(|e| e.case_id.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Stable sort by (case_id, timestamp); ties keep their current order
    pub fn sort_by_case_and_time(&mut self) {
        self.events.sort_by(|a, b| {
            a.case_id
                .cmp(&b.case_id)
                .then_with(|| a.timestamp.cmp(&b.timestamp))
        });
    }

    /// A new log with the same attribute columns holding the selected events
    pub fn with_events(&self, events: Vec<Event>) -> EventLog {
        EventLog::new(self.attributes.clone(), events)
    }

    /// Keep only the events of cases for which `keep` returns true.
    /// The log must be sorted by case.
    pub fn retain_cases<F>(&mut self, keep: F)
    where
        F: Fn(&[Event]) -> bool,
    {
        let mut kept: HashSet<String> = HashSet::new();
        for range in case_ranges(&self.events) {
            let case = &self.events[range];
            if keep(case) {
                kept.insert(case[0].case_id.clone());
            }
        }
        self.events.retain(|e| kept.contains(&e.case_id));
    }

    /// Full header of the persisted format
    pub fn header(&self) -> Vec<String> {
        let mut header = vec![
            CASE_ID.to_string(),
            EVENT_NAME.to_string(),
            EVENT_TIMESTAMP.to_string(),
        ];
        header.extend(
            self.attributes
                .iter()
                .filter(|a| !is_core_column(a))
                .cloned(),
        );
        header.push(CASE_LEN.to_string());
        header
    }

    /// Persist as delimited text
    pub fn write(&self, path: &Path, separator: u8) -> Result<()> {
        let header = self.header();
        let attributes = &header[3..header.len() - 1];
        let rows: Vec<Vec<Option<String>>> = self
            .events
            .iter()
            .map(|event| {
                let mut row = Vec::with_capacity(header.len());
                row.push(Some(event.case_id.clone()));
                row.push(Some(event.event_name.clone()));
                row.push(Some(format_timestamp(&event.timestamp)));
                for attribute in attributes {
                    row.push(event.attribute(attribute).render());
                }
                row.push(event.case_len.map(|n| n.to_string()));
                row
            })
            .collect();

        write_rows(path, separator, &header, &rows)
    }

    /// Persist the single-column `case_id` extract, one row per event
    pub fn write_case_ids(&self, path: &Path, separator: u8) -> Result<()> {
        let rows: Vec<Vec<Option<String>>> = self
            .events
            .iter()
            .map(|e| vec![Some(e.case_id.clone())])
            .collect();
        write_rows(path, separator, &[CASE_ID.to_string()], &rows)
    }

    /// Read a persisted log. Attribute columns are typed with `column_types`
    /// (strings when undeclared).
    pub fn read(
        path: &Path,
        separator: u8,
        column_types: &BTreeMap<String, ColumnType>,
    ) -> Result<EventLog> {
        let mut types = column_types.clone();
        for core in [CASE_ID, EVENT_NAME, EVENT_TIMESTAMP, CASE_LEN] {
            types.insert(core.to_string(), ColumnType::String);
        }
        let loaded = read_table(path, separator, &types, false)
            .with_context(|| format!("Failed to read event log: {}", path.display()))?;
        let table = loaded.table;

        let index_of = |column: &str| -> Result<usize, PipelineError> {
            table
                .column_index(column)
                .ok_or_else(|| PipelineError::MissingLogColumn {
                    path: path.to_path_buf(),
                    column: column.to_string(),
                })
        };
        let case_idx = index_of(CASE_ID)?;
        let name_idx = index_of(EVENT_NAME)?;
        let ts_idx = index_of(EVENT_TIMESTAMP)?;
        let len_idx = table.column_index(CASE_LEN);

        let attributes: Vec<(usize, String)> = table
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| !is_core_column(c))
            .map(|(i, c)| (i, c.clone()))
            .collect();

        let invalid = |row: usize, column: &str, value: &Value| PipelineError::InvalidLogValue {
            path: path.to_path_buf(),
            row: row + 1,
            column: column.to_string(),
            value: value.to_string(),
        };

        let mut events = Vec::with_capacity(table.height());
        for (row_idx, row) in table.rows.iter().enumerate() {
            let case_id = row[case_idx]
                .as_str()
                .ok_or_else(|| invalid(row_idx, CASE_ID, &row[case_idx]))?
                .to_string();
            let event_name = row[name_idx]
                .as_str()
                .ok_or_else(|| invalid(row_idx, EVENT_NAME, &row[name_idx]))?
                .to_string();
            let timestamp = row[ts_idx]
                .as_str()
                .and_then(parse_timestamp)
                .ok_or_else(|| invalid(row_idx, EVENT_TIMESTAMP, &row[ts_idx]))?;
            let case_len = match len_idx {
                Some(idx) => match &row[idx] {
                    Value::Null => None,
                    value => Some(
                        parse_case_len(value)
                            .ok_or_else(|| invalid(row_idx, CASE_LEN, value))?,
                    ),
                },
                None => None,
            };
            let attrs = attributes
                .iter()
                .map(|(idx, name)| (name.clone(), row[*idx].clone()))
                .collect();

            events.push(Event {
                case_id,
                event_name,
                timestamp,
                attributes: attrs,
                case_len,
            });
        }

        Ok(EventLog::new(
            attributes.into_iter().map(|(_, name)| name).collect(),
            events,
        ))
    }
}

fn is_core_column(column: &str) -> bool {
    matches!(column, CASE_ID | EVENT_NAME | EVENT_TIMESTAMP | CASE_LEN)
}

/// A case length is a non-negative whole number; `3.0` is accepted
fn parse_case_len(value: &Value) -> Option<usize> {
    let n = value.as_f64()?;
    if n >= 0.0 && n.fract() == 0.0 && n <= usize::MAX as f64 {
        Some(n as usize)
    } else {
        None
    }
}

/// Contiguous index ranges of events sharing a `case_id`.
/// Only meaningful on a log sorted by case.
pub fn case_ranges(events: &[Event]) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut start = 0;
    for idx in 1..=events.len() {
        if idx == events.len() || events[idx].case_id != events[start].case_id {
            if idx > start {
                ranges.push(start..idx);
            }
            start = idx;
        }
    }
    ranges
}
