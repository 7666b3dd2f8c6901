//! Tests for data-quality statistics

use std::collections::BTreeMap;

use tempfile::TempDir;
use tenderlog::pipeline::{
    analyze_missing_values, distinct_value_frequencies, load_table, summarize_table,
};

#[path = "common/mod.rs"]
mod common;

use common::write_lines;

#[test]
fn test_summary_counts_duplicates_and_missing() {
    let dir = TempDir::new().unwrap();
    let path = write_lines(
        dir.path(),
        "award.csv",
        &[
            "cig;esito;importo",
            "A;OK;10",
            "B;;20",
            "A;OK;10",
            "C;KO;",
            "D;OK;",
        ],
    );

    let loaded = load_table(&path, b';', &BTreeMap::new()).unwrap();
    let summary = summarize_table(&loaded.table, loaded.duplicates_dropped);

    assert_eq!(summary.file_name, "award.csv");
    assert_eq!(summary.rows_num, 4);
    assert_eq!(summary.cols_num, 3);
    assert_eq!(summary.duplicated_rows, 1);
    assert_eq!(summary.duplicated_rows_perc, 0.2);
    assert_eq!(summary.missing_values["cig"], 0);
    assert_eq!(summary.missing_values["esito"], 1);
    assert_eq!(summary.missing_values["importo"], 2);
}

#[test]
fn test_missing_values_in_column_order() {
    let dir = TempDir::new().unwrap();
    let path = write_lines(dir.path(), "t.csv", &["z;a", "1;", ";"]);
    let loaded = load_table(&path, b';', &BTreeMap::new()).unwrap();

    let missing = analyze_missing_values(&loaded.table);
    assert_eq!(missing, vec![("z".to_string(), 1), ("a".to_string(), 2)]);
}

#[test]
fn test_distinct_frequencies_percent_of_non_null() {
    let dir = TempDir::new().unwrap();
    let path = write_lines(
        dir.path(),
        "award.csv",
        &["cig;esito", "A;OK", "B;", "C;KO", "D;OK", "E;OK", "F;ANNULLATA"],
    );
    let loaded = load_table(&path, b';', &BTreeMap::new()).unwrap();

    let freqs = distinct_value_frequencies(&loaded.table, &["esito".to_string()]);
    let values: Vec<(&str, f64)> = freqs
        .iter()
        .map(|f| (f.value.as_str(), f.frequency_pct))
        .collect();
    assert_eq!(values, vec![("OK", 60.0), ("ANNULLATA", 20.0), ("KO", 20.0)]);
    assert!(freqs.iter().all(|f| f.column == "esito"));
}

#[test]
fn test_empty_table_summary() {
    let dir = TempDir::new().unwrap();
    let path = write_lines(dir.path(), "empty.csv", &["cig;esito"]);
    let loaded = load_table(&path, b';', &BTreeMap::new()).unwrap();
    let summary = summarize_table(&loaded.table, loaded.duplicates_dropped);
    assert_eq!(summary.rows_num, 0);
    assert_eq!(summary.duplicated_rows_perc, 0.0);
}
