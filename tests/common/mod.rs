//! Shared test utilities and fixture generators

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use tempfile::TempDir;
use tenderlog::config::{Config, Settings};
use tenderlog::pipeline::{ColumnType, Event, EventLog, Value};

/// Write a `;`-separated file from raw lines
pub fn write_lines(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, lines.join("\n") + "\n").unwrap();
    path
}

/// Midnight timestamp for a calendar date
pub fn day(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// Build an event with string attributes; `None` means null
pub fn event(
    case_id: &str,
    event_name: &str,
    timestamp: NaiveDateTime,
    attributes: &[(&str, Option<&str>)],
) -> Event {
    Event {
        case_id: case_id.to_string(),
        event_name: event_name.to_string(),
        timestamp,
        attributes: attributes
            .iter()
            .map(|(k, v)| (k.to_string(), Value::from(*v)))
            .collect(),
        case_len: None,
    }
}

/// Event carrying a region and an amount, as found in filtered logs
pub fn priced_event(case_id: &str, timestamp: NaiveDateTime, region: &str, amount: Option<f64>) -> Event {
    let mut e = event(case_id, "TENDER_NOTICE", timestamp, &[("sezione_regionale", Some(region))]);
    e.attributes
        .insert("importo_lotto".to_string(), Value::from(amount));
    e
}

pub fn log_of(attributes: &[&str], events: Vec<Event>) -> EventLog {
    EventLog::new(attributes.iter().map(|s| s.to_string()).collect(), events)
}

/// A small open-data directory:
///
/// - `TENDER_NOTICE.csv` (main source): cases C1..C4 and C7, one duplicate
///   row. C3 is in the excluded region, C4 is filtered out by `anno`.
/// - `AWARD.csv`: award events; C5 has no tender notice, one row has no date,
///   C7 is awarded before its notice.
/// - `CONTRACT_END.csv`: closing events.
/// - `BROKEN.csv`: mapping names a column the file does not have.
pub struct OpenDataFixture {
    pub dir: TempDir,
    pub config: Config,
}

pub fn open_data_fixture() -> OpenDataFixture {
    let dir = TempDir::new().unwrap();
    let od = dir.path().join("od");
    std::fs::create_dir_all(&od).unwrap();

    write_lines(
        &od,
        "TENDER_NOTICE.csv",
        &[
            "cig;data_pubblicazione;anno;cod_cpv;cig_accordo_quadro;settore;sezione_regionale;oggetto_principale_contratto;importo_lotto",
            "C1;2020-01-01;2020;45233140-2;;SETTORI ORDINARI;SEZIONE REGIONALE LAZIO;LAVORI;6000000",
            "C2;2020-02-01;2020;79000000-4;AQ1;SETTORI SPECIALI;SEZIONE REGIONALE  VENETO;SERVIZI;215000",
            "C3;2020-03-01;2020;33000000-0;;SETTORI ORDINARI;NON CLASSIFICATO;FORNITURE;100000",
            "C4;2019-05-01;2019;45000000-7;;SETTORI ORDINARI;SEZIONE REGIONALE LAZIO;LAVORI;10",
            "C1;2020-01-01;2020;45233140-2;;SETTORI ORDINARI;SEZIONE REGIONALE LAZIO;LAVORI;6000000",
            "C7;2020-06-01;2020;79000000-4;;SETTORI ORDINARI;SEZIONE REGIONALE LAZIO;SERVIZI;300000",
        ],
    );
    write_lines(
        &od,
        "AWARD.csv",
        &[
            "cig;data_aggiudicazione;esito",
            "C1;2020-02-15;AGGIUDICATA",
            "C2;2020-03-01;AGGIUDICATA",
            "C2;;AGGIUDICATA",
            "C3;2020-04-01;AGGIUDICATA",
            "C5;2020-01-01;AGGIUDICATA",
            "C7;2020-05-01;AGGIUDICATA",
        ],
    );
    write_lines(
        &od,
        "CONTRACT_END.csv",
        &["cig;data_fine", "C1;2020-03-01", "C2;2020-05-01"],
    );
    write_lines(&od, "BROKEN.csv", &["cig;data", "C1;2020-01-05"]);
    write_lines(&od, "._TENDER_NOTICE.csv", &["garbage"]);

    let mut settings = Settings::default();
    settings.od_dir = od;
    settings.log_dir = dir.path().join("log");
    settings.stats_dir = dir.path().join("stats");
    settings.main_file = "TENDER_NOTICE.csv".to_string();
    settings.log.opening_event = "TENDER_NOTICE".to_string();

    let mut column_types = BTreeMap::new();
    column_types.insert("importo_lotto".to_string(), ColumnType::Float);
    column_types.insert("anno".to_string(), ColumnType::Integer);

    let mut stats_columns = BTreeMap::new();
    stats_columns.insert("AWARD.csv".to_string(), vec!["esito".to_string()]);

    let mut filters = BTreeMap::new();
    let mut predicate = BTreeMap::new();
    predicate.insert("anno".to_string(), vec![serde_json::json!(2020)]);
    filters.insert("TENDER_NOTICE.csv".to_string(), vec![predicate]);

    let mut log_mappings = BTreeMap::new();
    log_mappings.insert(
        "TENDER_NOTICE.csv".to_string(),
        mapping(
            &["cig", "data_pubblicazione"],
            &[
                "oggetto_principale_contratto",
                "importo_lotto",
                "accordo_quadro",
                "cpv_division",
                "sezione_regionale",
            ],
        ),
    );
    log_mappings.insert(
        "AWARD.csv".to_string(),
        mapping(&["cig", "data_aggiudicazione"], &["esito"]),
    );
    log_mappings.insert(
        "CONTRACT_END.csv".to_string(),
        mapping(&["cig", "data_fine"], &[]),
    );
    log_mappings.insert(
        "BROKEN.csv".to_string(),
        mapping(&["cig", "data_missing"], &[]),
    );

    let config = Config::from_parts(settings, column_types, stats_columns, filters, log_mappings)
        .unwrap();

    OpenDataFixture { dir, config }
}

/// Mapping entries in the on-disk JSON layout
pub fn mapping(data: &[&str], features: &[&str]) -> Vec<BTreeMap<String, Vec<String>>> {
    let mut data_entry = BTreeMap::new();
    data_entry.insert(
        "event_log_data".to_string(),
        data.iter().map(|s| s.to_string()).collect(),
    );
    let mut features_entry = BTreeMap::new();
    features_entry.insert(
        "event_log_features".to_string(),
        features.iter().map(|s| s.to_string()).collect(),
    );
    vec![data_entry, features_entry]
}

/// Write the reference list used by the case filter
pub fn write_reference(config: &Config, ids: &[&str]) -> PathBuf {
    let dir = &config.settings.log_dir;
    std::fs::create_dir_all(dir).unwrap();
    let mut lines = vec!["cig_ted".to_string()];
    lines.extend(ids.iter().map(|s| s.to_string()));
    let path = config.reference_path();
    std::fs::write(&path, lines.join("\n") + "\n").unwrap();
    path
}
