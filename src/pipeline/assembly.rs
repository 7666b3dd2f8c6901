//! Log assembly: merge sub-logs into one case-indexed event log
//!
//! Steps, in order:
//! 1. concatenate and parse timestamps (a parse failure aborts)
//! 2. keep admissible cases
//! 3. stable sort by (case_id, timestamp)
//! 4. compute `case_len`
//! 5. keep cases opening with the configured event
//! 6. forward/backward fill trace attributes within each case
//! 7. drop cases carrying an excluded region

use crate::error::PipelineError;

use super::event::{case_ranges, Event, EventLog, SubLog};
use super::filter::AdmissibleCases;
use super::value::{parse_timestamp, Value};

/// Case-level rules applied while assembling
#[derive(Debug, Clone)]
pub struct AssemblyRules {
    pub opening_event: String,
    pub trace_attributes: Vec<String>,
    pub region_attribute: String,
    pub excluded_regions: Vec<String>,
}

/// Counts collected along the assembly steps
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblyStats {
    pub merged_events: usize,
    pub inadmissible_events: usize,
    pub non_opening_cases: usize,
    pub excluded_region_cases: usize,
    pub final_events: usize,
    pub final_cases: usize,
}

/// Merge sub-logs into a validated event log
pub fn assemble_log(
    sublogs: Vec<SubLog>,
    admissible: &AdmissibleCases,
    rules: &AssemblyRules,
) -> Result<(EventLog, AssemblyStats), PipelineError> {
    let mut stats = AssemblyStats::default();

    // Attribute columns: declared features in source order, then trace
    // attributes not declared by any source
    let mut attributes: Vec<String> = Vec::new();
    for sublog in &sublogs {
        for feature in &sublog.features {
            if !attributes.contains(feature) {
                attributes.push(feature.clone());
            }
        }
    }
    for attribute in &rules.trace_attributes {
        if !attributes.contains(attribute) {
            attributes.push(attribute.clone());
        }
    }

    let mut events = Vec::new();
    for sublog in sublogs {
        for raw in sublog.events {
            let timestamp = match &raw.timestamp {
                Value::Date(ts) => Some(*ts),
                Value::Str(s) => parse_timestamp(s),
                _ => None,
            }
            .ok_or_else(|| PipelineError::TimestampParse {
                case_id: raw.case_id.clone(),
                value: raw.timestamp.to_string(),
            })?;

            events.push(Event {
                case_id: raw.case_id,
                event_name: raw.event_name,
                timestamp,
                attributes: raw.attributes,
                case_len: None,
            });
        }
    }
    stats.merged_events = events.len();

    events.retain(|e| admissible.contains(&e.case_id));
    stats.inadmissible_events = stats.merged_events - events.len();

    let mut log = EventLog::new(attributes, events);
    log.sort_by_case_and_time();

    assign_case_len(&mut log.events);

    let before = log.case_count();
    log.retain_cases(|case| case[0].event_name == rules.opening_event);
    stats.non_opening_cases = before - log.case_count();

    for attribute in &rules.trace_attributes {
        fill_trace_attribute(&mut log.events, attribute);
    }

    let before = log.case_count();
    log.retain_cases(|case| {
        !case.iter().any(|e| match e.attribute(&rules.region_attribute) {
            Value::Str(region) => rules.excluded_regions.contains(region),
            _ => false,
        })
    });
    stats.excluded_region_cases = before - log.case_count();

    stats.final_events = log.len();
    stats.final_cases = log.case_count();

    tracing::info!(
        merged = stats.merged_events,
        inadmissible = stats.inadmissible_events,
        non_opening_cases = stats.non_opening_cases,
        excluded_region_cases = stats.excluded_region_cases,
        events = stats.final_events,
        cases = stats.final_cases,
        "event log assembled"
    );

    Ok((log, stats))
}

/// Broadcast the event count of each case to its events. Expects a log
/// sorted by case.
pub fn assign_case_len(events: &mut [Event]) {
    for range in case_ranges(events) {
        let len = range.len();
        for event in &mut events[range] {
            event.case_len = Some(len);
        }
    }
}

/// Forward-fill then backward-fill one attribute within each case.
///
/// Two explicit passes per case: the forward pass carries the last non-null
/// value seen, the backward pass carries the next non-null value ahead. Each
/// event keeps its forward value, falling back to the backward one.
pub fn fill_trace_attribute(events: &mut [Event], attribute: &str) {
    for range in case_ranges(events) {
        let case = &mut events[range];

        let mut forward: Vec<Option<Value>> = Vec::with_capacity(case.len());
        let mut carried: Option<Value> = None;
        for event in case.iter() {
            let value = event.attribute(attribute);
            if !value.is_null() {
                carried = Some(value.clone());
            }
            forward.push(carried.clone());
        }

        let mut backward: Vec<Option<Value>> = vec![None; case.len()];
        let mut carried: Option<Value> = None;
        for (idx, event) in case.iter().enumerate().rev() {
            let value = event.attribute(attribute);
            if !value.is_null() {
                carried = Some(value.clone());
            }
            backward[idx] = carried.clone();
        }

        for ((event, fwd), bwd) in case.iter_mut().zip(forward).zip(backward) {
            let filled = fwd.or(bwd).unwrap_or(Value::Null);
            event.attributes.insert(attribute.to_string(), filled);
        }
    }
}
