//! Row filtering of the main table and the admissible case set

use std::collections::{BTreeSet, HashSet};

use crate::error::PipelineError;

use super::loader::Table;
use super::value::Value;

/// Keep rows whose `column` value is one of `allowed`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowPredicate {
    pub column: String,
    pub allowed: BTreeSet<String>,
}

impl RowPredicate {
    pub fn new<I, S>(column: impl Into<String>, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            column: column.into(),
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }

    /// Allowed values that read as numbers
    fn allowed_numbers(&self) -> Vec<f64> {
        self.allowed
            .iter()
            .filter_map(|v| v.trim().parse::<f64>().ok())
            .collect()
    }

    /// Whether a cell passes this predicate. Numeric cells compare by value
    /// (`215000` matches `215000.0`), everything else by rendered text.
    /// Null cells never match.
    pub fn matches(&self, cell: &Value) -> bool {
        self.matches_with(cell, &self.allowed_numbers())
    }

    fn matches_with(&self, cell: &Value, numbers: &[f64]) -> bool {
        let Some(text) = cell.render() else {
            return false;
        };
        if self.allowed.contains(&text) {
            return true;
        }
        match cell {
            Value::Int(_) | Value::Float(_) => cell
                .as_f64()
                .map(|x| numbers.iter().any(|n| *n == x))
                .unwrap_or(false),
            _ => false,
        }
    }
}

/// Cases allowed into the assembled log
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissibleCases {
    /// No predicates were configured: every case is admissible
    Unrestricted,
    /// Only these case identifiers (possibly none)
    Only(HashSet<String>),
}

impl AdmissibleCases {
    pub fn contains(&self, case_id: &str) -> bool {
        match self {
            AdmissibleCases::Unrestricted => true,
            AdmissibleCases::Only(ids) => ids.contains(case_id),
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        matches!(self, AdmissibleCases::Unrestricted)
    }
}

/// Narrow the table to rows matching every predicate. Null cells never match.
pub fn apply_row_filters(table: &mut Table, predicates: &[RowPredicate]) -> Result<(), PipelineError> {
    for predicate in predicates {
        let idx = table
            .column_index(&predicate.column)
            .ok_or_else(|| PipelineError::MissingColumn {
                table: table.name.clone(),
                column: predicate.column.clone(),
            })?;
        let before = table.height();
        let numbers = predicate.allowed_numbers();
        table
            .rows
            .retain(|row| predicate.matches_with(&row[idx], &numbers));
        tracing::debug!(
            table = %table.name,
            column = %predicate.column,
            before,
            after = table.height(),
            "row filter applied"
        );
    }
    Ok(())
}

/// Filter the main table and collect the surviving case identifiers.
///
/// An empty predicate list leaves the table untouched and yields
/// [`AdmissibleCases::Unrestricted`].
pub fn filter_main_table(
    table: &mut Table,
    predicates: &[RowPredicate],
    case_column: &str,
) -> Result<AdmissibleCases, PipelineError> {
    if predicates.is_empty() {
        return Ok(AdmissibleCases::Unrestricted);
    }

    apply_row_filters(table, predicates)?;

    let idx = table
        .column_index(case_column)
        .ok_or_else(|| PipelineError::MissingColumn {
            table: table.name.clone(),
            column: case_column.to_string(),
        })?;
    let ids: HashSet<String> = table
        .rows
        .iter()
        .filter_map(|row| row[idx].render())
        .collect();

    if ids.is_empty() {
        tracing::warn!(
            table = %table.name,
            "row filters matched no rows; the assembled log will be empty"
        );
    }

    Ok(AdmissibleCases::Only(ids))
}
