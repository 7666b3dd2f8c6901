//! Tenderlog: event-log construction CLI
//!
//! Runs one pipeline stage per invocation, driven by a JSON config file.

use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;

use tenderlog::cli::{Cli, Commands};
use tenderlog::config::Config;
use tenderlog::report::{display_build_summary, display_filter_summary, display_partition_summary};
use tenderlog::stages::{run_build_log, run_case_filter, run_partition};
use tenderlog::utils::{
    create_source_progress, create_spinner, finish_with_success, finish_with_warning,
    init_tracing, print_banner, print_completion, print_config, print_info, print_step_header,
    print_step_time, print_success, print_warning,
};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level());

    let config = Config::load(&cli.config)
        .with_context(|| format!("Failed to load configuration: {}", cli.config.display()))?;

    print_banner(env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Build { stats } => build(&cli, &config, stats),
        Commands::Filter => filter(&cli, &config),
        Commands::Partition => partition(&cli, &config),
    }
}

fn build(cli: &Cli, config: &Config, stats: bool) -> Result<()> {
    let settings = &config.settings;
    print_config(&cli.config, &settings.od_dir, &config.log_path(), config.separator());
    print_step_header(1, "Event Extraction & Log Assembly");

    let step_start = Instant::now();
    let progress = create_source_progress();
    let report = run_build_log(config, stats, &progress)?;

    let failed = report.failed_sources().count();
    if failed == 0 {
        finish_with_success(&progress, "All sources processed");
    } else {
        finish_with_warning(&progress, &format!("{} source(s) failed", failed));
    }

    display_build_summary(&report);
    println!();
    print_success(&format!("Event log saved to {}", report.log_path.display()));
    print_success(&format!("Case ids saved to {}", report.case_ids_path.display()));
    if !report.stats_files.is_empty() {
        print_info(&format!(
            "{} statistics file(s) written to {}",
            report.stats_files.len(),
            settings.stats_dir.display()
        ));
    }
    print_step_time(step_start.elapsed());
    print_completion("Event log build");
    Ok(())
}

fn filter(cli: &Cli, config: &Config) -> Result<()> {
    print_config(
        &cli.config,
        &config.log_path(),
        &config.filtered_log_path(),
        config.separator(),
    );
    print_step_header(2, "Case Membership Filter");

    let step_start = Instant::now();
    let spinner = create_spinner("Filtering cases...");
    let report = run_case_filter(config)?;
    finish_with_success(&spinner, "Case filter complete");

    display_filter_summary(&report);
    println!();
    if report.output_events == 0 {
        print_warning("No events matched the reference list");
    }
    print_success(&format!("Filtered log saved to {}", report.output_path.display()));
    print_step_time(step_start.elapsed());
    print_completion("Case filter");
    Ok(())
}

fn partition(cli: &Cli, config: &Config) -> Result<()> {
    print_config(
        &cli.config,
        &config.filtered_log_path(),
        &config.settings.log_dir,
        config.separator(),
    );
    print_step_header(3, "Threshold & Category Partitioner");

    let step_start = Instant::now();
    let spinner = create_spinner("Partitioning log...");
    let report = run_partition(config)?;
    finish_with_success(&spinner, "Partitioning complete");

    display_partition_summary(&report);
    println!();
    for p in &report.partitions {
        print_success(&format!(
            "{}: {} / {}",
            p.category,
            p.above_path.display(),
            p.below_path.display()
        ));
    }
    print_success(&format!("Duration statistics saved to {}", report.stats_path.display()));
    print_step_time(step_start.elapsed());
    print_completion("Partitioning");
    Ok(())
}
