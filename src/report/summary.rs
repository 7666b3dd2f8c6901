//! Stage summary tables

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use console::style;

use crate::pipeline::format_float;
use crate::stages::{BuildReport, FilterReport, PartitionReport, SourceOutcome};

fn print_title(icon: &str, title: &str) {
    println!();
    println!("    {} {}", style(icon).cyan(), style(title).white().bold());
    println!("    {}", style("─".repeat(50)).dim());
    println!();
}

fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(
        header
            .iter()
            .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
            .collect::<Vec<_>>(),
    );
    table
}

// Indent the table
fn print_indented(table: &Table) {
    for line in table.to_string().lines() {
        println!("    {}", line);
    }
}

/// Per-source outcomes followed by assembly counts
pub fn display_build_summary(report: &BuildReport) {
    print_title("📋", "SOURCES");

    let mut sources = new_table(&["Source", "Rows", "Duplicates", "Events", "Status"]);
    for source in &report.sources {
        let (events, status) = match &source.outcome {
            SourceOutcome::Extracted(stats) => (
                Cell::new(stats.events),
                Cell::new("extracted").fg(Color::Green),
            ),
            SourceOutcome::NoMapping => (Cell::new("-"), Cell::new("no mapping").fg(Color::White)),
            SourceOutcome::Failed(e) => (Cell::new("-"), Cell::new(format!("failed: {}", e)).fg(Color::Red)),
        };
        sources.add_row(vec![
            Cell::new(&source.file_name),
            Cell::new(source.rows),
            Cell::new(source.duplicates_dropped),
            events,
            status,
        ]);
    }
    print_indented(&sources);

    print_title("📊", "EVENT LOG");
    let a = &report.assembly;
    let mut table = new_table(&["Metric", "Value"]);
    table.add_row(vec![
        Cell::new("Admissible cases"),
        Cell::new(
            report
                .admissible_cases
                .map(|n| n.to_string())
                .unwrap_or_else(|| "unrestricted".to_string()),
        ),
    ]);
    table.add_row(vec![Cell::new("Merged events"), Cell::new(a.merged_events)]);
    table.add_row(vec![
        Cell::new("Inadmissible events"),
        Cell::new(a.inadmissible_events),
    ]);
    table.add_row(vec![
        Cell::new("Cases without opening event"),
        Cell::new(a.non_opening_cases),
    ]);
    table.add_row(vec![
        Cell::new("Excluded region cases"),
        Cell::new(a.excluded_region_cases),
    ]);
    table.add_row(vec![
        Cell::new("Final events"),
        Cell::new(a.final_events)
            .fg(Color::Green)
            .add_attribute(Attribute::Bold),
    ]);
    table.add_row(vec![
        Cell::new("Final cases"),
        Cell::new(a.final_cases)
            .fg(Color::Green)
            .add_attribute(Attribute::Bold),
    ]);
    print_indented(&table);
}

pub fn display_filter_summary(report: &FilterReport) {
    print_title("📋", "CASE FILTER");

    let mut table = new_table(&["Metric", "Value"]);
    table.add_row(vec![Cell::new("Reference identifiers"), Cell::new(report.reference_ids)]);
    table.add_row(vec![
        Cell::new("Boundary rule"),
        Cell::new(if report.boundary_rule { "on" } else { "off" }),
    ]);
    table.add_row(vec![
        Cell::new("Events (in → out)"),
        Cell::new(format!("{} → {}", report.input_events, report.output_events)),
    ]);
    table.add_row(vec![
        Cell::new("Cases (in → out)"),
        Cell::new(format!("{} → {}", report.input_cases, report.output_cases))
            .fg(Color::Green)
            .add_attribute(Attribute::Bold),
    ]);
    print_indented(&table);
}

pub fn display_partition_summary(report: &PartitionReport) {
    print_title("📋", "PARTITIONS");

    let mut partitions = new_table(&[
        "Category",
        "Threshold",
        "Above (events/cases)",
        "Below (events/cases)",
        "No amount",
    ]);
    for p in &report.partitions {
        partitions.add_row(vec![
            Cell::new(&p.category).add_attribute(Attribute::Bold),
            Cell::new(format_float(p.threshold)),
            Cell::new(format!("{} / {}", p.above_events, p.above_cases)),
            Cell::new(format!("{} / {}", p.below_events, p.below_cases)),
            Cell::new(p.missing_amounts).fg(if p.missing_amounts == 0 {
                Color::White
            } else {
                Color::Yellow
            }),
        ]);
    }
    print_indented(&partitions);

    print_title("⏱️ ", "DURATION BY CONTRACT TYPE (months)");
    let mut durations = new_table(&["Category", "Cases", "Mean", "Median", "Std dev", "Non-positive"]);
    for d in &report.durations {
        durations.add_row(vec![
            Cell::new(&d.category).add_attribute(Attribute::Bold),
            Cell::new(d.case_count),
            Cell::new(format!("{:.2}", d.mean_duration)),
            Cell::new(format!("{:.2}", d.median_duration)),
            Cell::new(
                d.std_dev_duration
                    .map(|s| format!("{:.2}", s))
                    .unwrap_or_else(|| "-".to_string()),
            ),
            Cell::new(d.non_positive_cases),
        ]);
    }
    print_indented(&durations);
}
