//! Error types for configuration, extraction and log assembly
//!
//! Per-source problems (`ExtractionError`) are recoverable: the source yields
//! no events and the run continues. `PipelineError` and `ConfigError` abort
//! the stage.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading the run configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in configuration file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("field separator must be a single ASCII character, got {0:?}")]
    InvalidSeparator(String),

    #[error("central region {0:?} is not part of the configured region list")]
    UnknownCentralRegion(String),
}

/// Per-source extraction failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("source '{source_name}': column names for case_id and event_timestamp are not specified correctly or are missing")]
    MissingCaseTimestampPair { source_name: String },

    #[error("source '{source_name}': mapped column '{column}' not found in table")]
    MissingColumn { source_name: String, column: String },
}

/// Fatal errors in cleanup, filtering and log assembly
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("table '{table}' is missing expected column '{column}'")]
    MissingColumn { table: String, column: String },

    #[error("case '{case_id}': cannot parse event timestamp {value:?}")]
    TimestampParse { case_id: String, value: String },

    #[error("event log {path} is missing required column '{column}'")]
    MissingLogColumn { path: PathBuf, column: String },

    #[error("event log {path}, row {row}: invalid value {value:?} in column '{column}'")]
    InvalidLogValue {
        path: PathBuf,
        row: usize,
        column: String,
        value: String,
    },
}
