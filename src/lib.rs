//! Tenderlog: process-mining event logs from procurement open data
//!
//! Three batch stages: assemble an event log from per-file tender records,
//! restrict it to a reference list of cases, and partition it by contract
//! amount thresholds with case-duration statistics.

pub mod cli;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod stages;
pub mod utils;
