//! Tests for configuration loading

use std::path::PathBuf;

use tempfile::TempDir;
use tenderlog::config::Config;
use tenderlog::error::ConfigError;
use tenderlog::pipeline::{ColumnType, RowPredicate};

#[path = "common/mod.rs"]
mod common;

use common::write_lines;

fn write_config_files(dir: &TempDir, main: &str) -> PathBuf {
    let conf = dir.path().join("conf");
    std::fs::create_dir_all(&conf).unwrap();
    write_lines(
        &conf,
        "columns_type.json",
        &[r#"{"importo_lotto": "float64", "anno": "int", "data_pubblicazione": "datetime", "cig": "object"}"#],
    );
    write_lines(
        &conf,
        "stats_columns.json",
        &[r#"{"award.csv": ["esito"]}"#],
    );
    write_lines(
        &conf,
        "filters.json",
        &[r#"{"tender_notice.csv": [{"anno": [2020, 2021]}, {"settore": ["ORDINARI"]}]}"#],
    );
    write_lines(
        &conf,
        "log_mapping.json",
        &[r#"{"tender_notice.csv": [{"event_log_data": ["cig", "data_pubblicazione"]}, {"event_log_features": ["importo_lotto"]}]}"#],
    );
    write_lines(&conf, "tenderlog.json", &[main])
}

#[test]
fn test_load_config_with_mapping_files() {
    let dir = TempDir::new().unwrap();
    let path = write_config_files(
        &dir,
        r#"{
            "od_dir": "od",
            "csv_sep": ";",
            "columns_type_file": "columns_type.json",
            "stats_columns_file": "stats_columns.json",
            "filters_file": "filters.json",
            "log_mapping_file": "log_mapping.json",
            "case_filter": {"require_boundaries": true}
        }"#,
    );

    let config = Config::load(&path).unwrap();

    assert_eq!(config.separator(), b';');
    assert_eq!(config.reference_separator(), b',');
    assert_eq!(config.column_types["importo_lotto"], ColumnType::Float);
    assert_eq!(config.column_types["anno"], ColumnType::Integer);
    assert_eq!(config.column_types["data_pubblicazione"], ColumnType::Date);
    assert_eq!(config.column_types["cig"], ColumnType::String);
    assert_eq!(config.stats_columns("award.csv"), ["esito".to_string()]);
    assert!(config.stats_columns("other.csv").is_empty());

    assert_eq!(
        config.row_predicates("tender_notice.csv"),
        vec![
            RowPredicate::new("anno", ["2020", "2021"]),
            RowPredicate::new("settore", ["ORDINARI"]),
        ]
    );
    assert!(config.row_predicates("award.csv").is_empty());
    assert_eq!(config.mapping_entries("tender_notice.csv").len(), 2);

    let rule = config.boundary_rule().unwrap();
    assert_eq!(rule.opening, "TENDER_NOTICE");
    assert_eq!(rule.closing, "CONTRACT_END");
}

#[test]
fn test_defaults_fill_missing_fields() {
    let dir = TempDir::new().unwrap();
    let path = write_config_files(&dir, "{}");
    let config = Config::load(&path).unwrap();
    let settings = &config.settings;

    assert_eq!(settings.main_file, "tender_notice.csv");
    assert_eq!(settings.od_file_type, ".csv");
    assert!(!settings.collect_stats);
    assert!(config.column_types.is_empty());
    assert!(config.boundary_rule().is_none());

    let names: Vec<&str> = settings
        .partition
        .thresholds
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(names, vec!["LAVORI", "SERVIZI", "FORNITURE"]);
    assert_eq!(settings.partition.thresholds[0].threshold, 5_382_000.0);
    assert!(config.region_filter().len() > 20);
    assert!(config.log_path().ends_with("anac_log_2016_2022.csv"));
    assert!(config
        .duration_stats_path()
        .ends_with("anac_log_2016_2022_duration_by_oggetto_contratto.csv"));
    assert_eq!(settings.log.log_column_types["importo_lotto"], ColumnType::Float);
}

#[test]
fn test_multi_character_separator_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config_files(&dir, r#"{"csv_sep": ";;"}"#);
    let err = Config::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidSeparator(ref s) if s == ";;"));
}

#[test]
fn test_central_region_must_be_listed() {
    let dir = TempDir::new().unwrap();
    let path = write_config_files(
        &dir,
        r#"{"partition": {"regions": ["LAZIO"], "central_region": "CENTRALE"}}"#,
    );
    let err = Config::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::UnknownCentralRegion(_)));
}

#[test]
fn test_missing_and_malformed_files() {
    let dir = TempDir::new().unwrap();
    let err = Config::load(&dir.path().join("nope.json")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));

    let path = write_config_files(&dir, "{ not json");
    let err = Config::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));

    let path = write_config_files(&dir, r#"{"filters_file": "missing_filters.json"}"#);
    let err = Config::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Io { ref path, .. } if path.ends_with("missing_filters.json")));
}

#[test]
fn test_shipped_sample_config_loads() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tenderlog.json");
    let config = Config::load(&path).unwrap();

    assert_eq!(config.settings.main_file, "TENDER_NOTICE.csv");
    assert_eq!(config.mapping_entries("CONTRACT_END.csv").len(), 1);
    assert_eq!(
        config.row_predicates("TENDER_NOTICE.csv")[1],
        RowPredicate::new("settore", ["ORDINARI"])
    );
    assert_eq!(config.column_types["data_pubblicazione"], ColumnType::Date);
}
