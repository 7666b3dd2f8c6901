//! Tests for log assembly: ordering, case length, opening event, trace
//! attribute propagation and region exclusion

use std::collections::{BTreeMap, HashSet};

use tenderlog::error::PipelineError;
use tenderlog::pipeline::{
    assemble_log, case_ranges, fill_trace_attribute, raw_event, AdmissibleCases, AssemblyRules,
    RawEvent, SubLog, Value,
};

#[path = "common/mod.rs"]
mod common;

use common::{day, event};

fn rules() -> AssemblyRules {
    AssemblyRules {
        opening_event: "TENDER_NOTICE".to_string(),
        trace_attributes: vec!["importo_lotto".to_string(), "sezione_regionale".to_string()],
        region_attribute: "sezione_regionale".to_string(),
        excluded_regions: vec!["NON CLASSIFICATO".to_string()],
    }
}

fn with_attrs(mut raw: RawEvent, attrs: &[(&str, Value)]) -> RawEvent {
    for (k, v) in attrs {
        raw.attributes.insert(k.to_string(), v.clone());
    }
    raw
}

fn sublog(source: &str, features: &[&str], events: Vec<RawEvent>) -> SubLog {
    SubLog {
        source: source.to_string(),
        features: features.iter().map(|s| s.to_string()).collect(),
        events,
    }
}

fn notices() -> SubLog {
    sublog(
        "TENDER_NOTICE.csv",
        &["importo_lotto", "sezione_regionale"],
        vec![
            with_attrs(
                raw_event("C1", "TENDER_NOTICE", "2020-01-01"),
                &[
                    ("importo_lotto", Value::Float(1000.0)),
                    ("sezione_regionale", Value::from("LAZIO")),
                ],
            ),
            with_attrs(
                raw_event("C2", "TENDER_NOTICE", "2020-02-01"),
                &[
                    ("importo_lotto", Value::Null),
                    ("sezione_regionale", Value::from("NON CLASSIFICATO")),
                ],
            ),
            with_attrs(
                raw_event("C3", "TENDER_NOTICE", "2020-03-10"),
                &[
                    ("importo_lotto", Value::Float(50.0)),
                    ("sezione_regionale", Value::from("VENETO")),
                ],
            ),
        ],
    )
}

fn awards() -> SubLog {
    sublog(
        "AWARD.csv",
        &["esito"],
        vec![
            with_attrs(
                raw_event("C1", "AWARD", "2020-03-01 09:30:00"),
                &[("esito", Value::from("OK"))],
            ),
            with_attrs(
                raw_event("C3", "AWARD", "2020-03-01"),
                &[("esito", Value::from("OK"))],
            ),
            with_attrs(
                raw_event("C2", "AWARD", "2020-02-20"),
                &[("esito", Value::from("OK"))],
            ),
        ],
    )
}

#[test]
fn test_assembled_log_is_sorted_with_case_len() {
    let (log, stats) =
        assemble_log(vec![notices(), awards()], &AdmissibleCases::Unrestricted, &rules()).unwrap();

    // C2 is excluded by region, C3 opens with an award
    let ids: Vec<&str> = log.events.iter().map(|e| e.case_id.as_str()).collect();
    assert_eq!(ids, vec!["C1", "C1"]);
    assert_eq!(log.events[0].event_name, "TENDER_NOTICE");
    assert_eq!(log.events[1].event_name, "AWARD");
    assert!(log.events.iter().all(|e| e.case_len == Some(2)));

    assert_eq!(stats.merged_events, 6);
    assert_eq!(stats.inadmissible_events, 0);
    assert_eq!(stats.non_opening_cases, 1);
    assert_eq!(stats.excluded_region_cases, 1);
    assert_eq!(stats.final_events, 2);
    assert_eq!(stats.final_cases, 1);

    assert_eq!(
        log.attributes,
        vec!["importo_lotto", "sezione_regionale", "esito"]
    );
}

#[test]
fn test_every_case_opens_with_opening_event() {
    let (log, _) =
        assemble_log(vec![awards(), notices()], &AdmissibleCases::Unrestricted, &rules()).unwrap();
    for range in case_ranges(&log.events) {
        assert_eq!(log.events[range.start].event_name, "TENDER_NOTICE");
    }
}

#[test]
fn test_non_opening_case_removed_entirely() {
    let (log, _) =
        assemble_log(vec![notices(), awards()], &AdmissibleCases::Unrestricted, &rules()).unwrap();
    assert!(log.events.iter().all(|e| e.case_id != "C3"));
}

#[test]
fn test_case_len_counts_events_after_admissibility() {
    let extra = sublog(
        "CONTRACT_END.csv",
        &[],
        vec![
            raw_event("C1", "CONTRACT_END", "2020-06-01"),
            raw_event("C1", "CONTRACT_END", "2020-06-01"),
        ],
    );
    let (log, _) = assemble_log(
        vec![notices(), awards(), extra],
        &AdmissibleCases::Unrestricted,
        &rules(),
    )
    .unwrap();

    for range in case_ranges(&log.events) {
        let n = range.len();
        assert!(log.events[range].iter().all(|e| e.case_len == Some(n)));
    }
    assert_eq!(log.events[0].case_len, Some(4));
}

#[test]
fn test_inadmissible_cases_dropped() {
    let admissible = AdmissibleCases::Only(HashSet::from(["C3".to_string()]));
    let (log, stats) = assemble_log(vec![notices(), awards()], &admissible, &rules()).unwrap();
    assert_eq!(stats.inadmissible_events, 4);
    // C3 starts with its award
    assert!(log.is_empty());
}

#[test]
fn test_trace_attributes_propagated_within_case() {
    let (log, _) =
        assemble_log(vec![notices(), awards()], &AdmissibleCases::Unrestricted, &rules()).unwrap();
    for e in &log.events {
        assert_eq!(e.attribute("importo_lotto"), &Value::Float(1000.0));
        assert_eq!(e.attribute("sezione_regionale"), &Value::from("LAZIO"));
    }
    // non-trace features are not propagated
    assert_eq!(log.events[0].attribute("esito"), &Value::Null);
}

#[test]
fn test_excluded_region_removes_whole_case() {
    let awards_with_region = sublog(
        "AWARD.csv",
        &["sezione_regionale"],
        vec![with_attrs(
            raw_event("C1", "AWARD", "2020-03-01"),
            &[("sezione_regionale", Value::from("NON CLASSIFICATO"))],
        )],
    );
    let (log, stats) = assemble_log(
        vec![notices(), awards_with_region],
        &AdmissibleCases::Unrestricted,
        &rules(),
    )
    .unwrap();
    assert!(log.events.iter().all(|e| e.case_id != "C1"));
    assert!(log.events.iter().all(|e| e.case_id != "C2"));
    assert_eq!(stats.excluded_region_cases, 2);
}

#[test]
fn test_unparseable_timestamp_is_fatal() {
    let bad = sublog("AWARD.csv", &[], vec![raw_event("C1", "AWARD", "15/02/2020")]);
    let err = assemble_log(vec![notices(), bad], &AdmissibleCases::Unrestricted, &rules())
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::TimestampParse { ref case_id, .. } if case_id == "C1"
    ));
}

#[test]
fn test_ties_keep_extraction_order() {
    let a = sublog("A.csv", &[], vec![raw_event("C1", "TENDER_NOTICE", "2020-01-01")]);
    let b = sublog("B.csv", &[], vec![raw_event("C1", "B", "2020-01-01")]);
    let (log, _) = assemble_log(vec![a, b], &AdmissibleCases::Unrestricted, &rules()).unwrap();
    let names: Vec<&str> = log.events.iter().map(|e| e.event_name.as_str()).collect();
    assert_eq!(names, vec!["TENDER_NOTICE", "B"]);

    let a = sublog("A.csv", &[], vec![raw_event("C1", "TENDER_NOTICE", "2020-01-01")]);
    let b = sublog("B.csv", &[], vec![raw_event("C1", "B", "2020-01-01")]);
    let (log, stats) = assemble_log(vec![b, a], &AdmissibleCases::Unrestricted, &rules()).unwrap();
    assert!(log.is_empty(), "B comes first on a tie and is not an opening event");
    assert_eq!(stats.non_opening_cases, 1);
}

fn region(value: Option<&str>) -> [(&str, Option<&str>); 1] {
    [("region", value)]
}

#[test]
fn test_fill_all_or_nothing_with_single_distinct_value() {
    let mut events = vec![
        event("A", "X", day(2020, 1, 1), &region(None)),
        event("A", "X", day(2020, 1, 2), &region(Some("LAZIO"))),
        event("A", "X", day(2020, 1, 3), &region(None)),
        event("A", "X", day(2020, 1, 4), &region(Some("LAZIO"))),
        event("B", "X", day(2020, 1, 1), &region(None)),
        event("B", "X", day(2020, 1, 2), &region(None)),
    ];
    fill_trace_attribute(&mut events, "region");

    assert!(events[..4]
        .iter()
        .all(|e| e.attribute("region") == &Value::from("LAZIO")));
    assert!(events[4..].iter().all(|e| e.attribute("region").is_null()));
}

#[test]
fn test_fill_keeps_own_values_when_case_disagrees() {
    let mut events = vec![
        event("A", "X", day(2020, 1, 1), &region(None)),
        event("A", "X", day(2020, 1, 2), &region(Some("LAZIO"))),
        event("A", "X", day(2020, 1, 3), &region(None)),
        event("A", "X", day(2020, 1, 4), &region(Some("VENETO"))),
    ];
    fill_trace_attribute(&mut events, "region");
    let values: Vec<String> = events
        .iter()
        .map(|e| e.attribute("region").to_string())
        .collect();
    assert_eq!(values, vec!["LAZIO", "LAZIO", "LAZIO", "VENETO"]);
}

#[test]
fn test_fill_adds_missing_attribute_as_null() {
    let mut events = vec![event("A", "X", day(2020, 1, 1), &[])];
    fill_trace_attribute(&mut events, "region");
    let attrs: BTreeMap<String, Value> = events[0].attributes.clone();
    assert_eq!(attrs.get("region"), Some(&Value::Null));
}
