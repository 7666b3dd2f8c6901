//! Above/below threshold partitions per contract category

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::event::{Event, EventLog};

/// A contract category and its amount threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub threshold: f64,
}

impl Category {
    pub fn new(name: impl Into<String>, threshold: f64) -> Self {
        Self {
            name: name.into(),
            threshold,
        }
    }
}

/// Region allow-list: every configured region except the central one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionFilter {
    allowed: HashSet<String>,
}

impl RegionFilter {
    pub fn excluding_central(regions: &[String], central: &str) -> Self {
        Self {
            allowed: regions
                .iter()
                .filter(|r| r.as_str() != central)
                .cloned()
                .collect(),
        }
    }

    pub fn allows(&self, event: &Event, region_attribute: &str) -> bool {
        event
            .attribute(region_attribute)
            .as_str()
            .map(|r| self.allowed.contains(r))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.allowed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }
}

/// Result of splitting a log for one category
#[derive(Debug, Clone)]
pub struct Partition {
    pub category: Category,
    pub above: EventLog,
    pub below: EventLog,
    /// Region-allowed events without a numeric amount, counted in `below`
    pub missing_amounts: usize,
}

/// Restrict to allowed regions and split by `amount > threshold`.
///
/// An amount equal to the threshold goes below. Events without a numeric
/// amount cannot exceed the threshold and also go below. Both halves are
/// sorted by (case_id, timestamp).
pub fn split_by_threshold(
    log: &EventLog,
    category: &Category,
    regions: &RegionFilter,
    region_attribute: &str,
    amount_attribute: &str,
) -> Partition {
    let mut above = Vec::new();
    let mut below = Vec::new();
    let mut missing_amounts = 0;

    for event in log.events.iter().filter(|e| regions.allows(e, region_attribute)) {
        match event.attribute(amount_attribute).as_f64() {
            Some(amount) if amount > category.threshold => above.push(event.clone()),
            Some(_) => below.push(event.clone()),
            None => {
                missing_amounts += 1;
                below.push(event.clone());
            }
        }
    }

    let mut above = log.with_events(above);
    let mut below = log.with_events(below);
    above.sort_by_case_and_time();
    below.sort_by_case_and_time();

    if missing_amounts > 0 {
        tracing::warn!(
            category = %category.name,
            missing_amounts,
            "events without a numeric amount were classified below threshold"
        );
    }

    Partition {
        category: category.clone(),
        above,
        below,
        missing_amounts,
    }
}

/// Partition the log once per category, in the given order
pub fn partition_log(
    log: &EventLog,
    categories: &[Category],
    regions: &RegionFilter,
    region_attribute: &str,
    amount_attribute: &str,
) -> Vec<Partition> {
    categories
        .iter()
        .map(|c| split_by_threshold(log, c, regions, region_attribute, amount_attribute))
        .collect()
}
