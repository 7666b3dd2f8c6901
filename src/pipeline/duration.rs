//! Case-duration statistics per contract type
//!
//! Duration in months is whole calendar months plus leftover days / 30.
//! This is an approximation and is kept as such since downstream analyses
//! rely on it.

use std::collections::BTreeMap;

use chrono::{Datelike, Months, NaiveDateTime};

use super::event::{case_ranges, EventLog};
use super::value::Value;

/// Duration of one case
#[derive(Debug, Clone, PartialEq)]
pub struct CaseDuration {
    pub case_id: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub months: f64,
}

/// Aggregate statistics for one category
#[derive(Debug, Clone, PartialEq)]
pub struct DurationStats {
    pub category: String,
    pub case_count: usize,
    pub mean_duration: f64,
    pub median_duration: f64,
    /// Sample standard deviation; `None` with fewer than two cases
    pub std_dev_duration: Option<f64>,
    /// Cases with a zero or negative duration; flagged, still counted above
    pub non_positive_cases: usize,
}

/// Whole months between two instants plus leftover days / 30.
///
/// Month addition clamps to the end of the month (Jan 31 + 1 month is
/// Feb 28/29). Sub-day remainders are ignored.
pub fn months_between(start: NaiveDateTime, end: NaiveDateTime) -> f64 {
    if end < start {
        return -months_between(end, start);
    }

    let mut months = (month_index(&end) - month_index(&start)).max(0) as u32;
    let mut anchor = add_months(start, months);
    while months > 0 && anchor > end {
        months -= 1;
        anchor = add_months(start, months);
    }

    let days = (end - anchor).num_days();
    months as f64 + days as f64 / 30.0
}

fn add_months(ts: NaiveDateTime, months: u32) -> NaiveDateTime {
    ts.checked_add_months(Months::new(months)).unwrap_or(NaiveDateTime::MAX)
}

fn month_index(ts: &NaiveDateTime) -> i64 {
    ts.year() as i64 * 12 + ts.month0() as i64
}

/// Start, end and duration of every case. Expects a log sorted by case.
pub fn case_durations(log: &EventLog) -> Vec<CaseDuration> {
    case_ranges(&log.events)
        .into_iter()
        .map(|range| {
            let case = &log.events[range];
            let first = case[0].timestamp;
            let start_time = case.iter().map(|e| e.timestamp).fold(first, std::cmp::min);
            let end_time = case.iter().map(|e| e.timestamp).fold(first, std::cmp::max);
            CaseDuration {
                case_id: case[0].case_id.clone(),
                start_time,
                end_time,
                months: months_between(start_time, end_time),
            }
        })
        .collect()
}

/// Group case durations by `category_attribute` and summarise each group.
///
/// A case joins the group of each distinct non-null category value its events
/// carry, with its maximum duration. Cases with no category are skipped.
/// Groups are returned sorted by category; statistics are rounded to two
/// decimals.
pub fn duration_stats(log: &EventLog, category_attribute: &str) -> Vec<DurationStats> {
    let mut sorted = log.clone();
    sorted.sort_by_case_and_time();

    let durations = case_durations(&sorted);
    let non_positive = durations.iter().filter(|d| d.months <= 0.0).count();
    if non_positive > 0 {
        tracing::warn!(
            cases = non_positive,
            "cases with zero or negative durations"
        );
    }

    // (category, case) -> max duration
    let mut per_case: BTreeMap<(String, String), f64> = BTreeMap::new();
    for (range, duration) in case_ranges(&sorted.events).into_iter().zip(&durations) {
        for event in &sorted.events[range] {
            let category = match event.attribute(category_attribute) {
                Value::Null => continue,
                value => value.to_string(),
            };
            let entry = per_case
                .entry((category, duration.case_id.clone()))
                .or_insert(duration.months);
            *entry = entry.max(duration.months);
        }
    }

    let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for ((category, _), months) in per_case {
        groups.entry(category).or_default().push(months);
    }

    groups
        .into_iter()
        .map(|(category, values)| DurationStats {
            category,
            case_count: values.len(),
            mean_duration: round2(mean(&values)),
            median_duration: round2(median(&values)),
            std_dev_duration: sample_std_dev(&values).map(round2),
            non_positive_cases: values.iter().filter(|m| **m <= 0.0).count(),
        })
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
