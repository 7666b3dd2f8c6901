//! Command-line argument definitions using clap

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Tenderlog - Build process-mining event logs from public-procurement open data
#[derive(Parser, Debug)]
#[command(name = "tenderlog")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Main JSON configuration file. Mapping files it references are resolved
    /// relative to its directory.
    #[arg(short, long, global = true, default_value = "tenderlog.json")]
    pub config: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    /// RUST_LOG takes precedence when set.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Stage 1: extract events from every source and assemble the event log
    Build {
        /// Also write data-quality statistics for every source
        #[arg(long, default_value = "false")]
        stats: bool,
    },

    /// Stage 2: restrict the event log to the reference case list
    Filter,

    /// Stage 3: split the filtered log by amount threshold per category and
    /// compute case-duration statistics
    Partition,
}

impl Cli {
    /// Default tracing directive for the requested verbosity
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
