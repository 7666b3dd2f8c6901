//! Cell values and column types
//!
//! Every cell read from a source table is resolved into one of a small set of
//! value kinds. Nothing downstream of the loader sees untyped text.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// Declared type of a column in the global column-type map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    #[default]
    #[serde(alias = "object", alias = "str", alias = "category")]
    String,
    #[serde(alias = "int", alias = "int64", alias = "int32")]
    Integer,
    #[serde(alias = "float64", alias = "float32", alias = "double")]
    Float,
    #[serde(alias = "datetime", alias = "timestamp")]
    Date,
}

/// A single typed cell
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Str(String),
    Int(i64),
    Float(f64),
    Date(NaiveDateTime),
}

impl Value {
    /// Resolve a raw cell into a typed value.
    ///
    /// Returns `None` when the text is present but does not parse as the
    /// declared type; callers decide how to treat malformed cells.
    pub fn parse(raw: Option<&str>, column_type: ColumnType) -> Option<Value> {
        let Some(text) = raw else {
            return Some(Value::Null);
        };
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Some(Value::Null);
        }

        match column_type {
            ColumnType::String => Some(Value::Str(text.to_string())),
            ColumnType::Integer => trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| {
                    // "12.0" is what float-typed writers produce for integral values
                    trimmed
                        .parse::<f64>()
                        .ok()
                        .filter(|f| f.fract() == 0.0 && f.is_finite())
                        .map(|f| f as i64)
                })
                .map(Value::Int),
            ColumnType::Float => trimmed.parse::<f64>().ok().map(Value::Float),
            ColumnType::Date => parse_timestamp(trimmed).map(Value::Date),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view used by threshold comparisons
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Str(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Text written to delimited output; `None` for null
    pub fn render(&self) -> Option<String> {
        match self {
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Str(s) => f.write_str(s),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", format_float(*x)),
            Value::Date(ts) => f.write_str(&format_timestamp(ts)),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Floats with no fractional part keep one decimal so that integral amounts
/// stay distinguishable from integer columns.
pub fn format_float(x: f64) -> String {
    if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e15 {
        format!("{:.1}", x)
    } else {
        format!("{}", x)
    }
}

/// Midnight timestamps are written as plain dates
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    if ts.time() == NaiveTime::MIN {
        ts.format("%Y-%m-%d").to_string()
    } else if ts.nanosecond() == 0 {
        ts.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        ts.format("%Y-%m-%d %H:%M:%S%.f").to_string()
    }
}

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parse the date/time layouts found in open-data extracts
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    for format in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(text, format) {
            return Some(ts);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}
