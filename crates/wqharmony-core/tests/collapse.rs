use polars::prelude::*;

use wqharmony_core::collapse::{collapse_results, CollapseOptions};
use wqharmony_core::config::DuplicatePolicy;
use wqharmony_core::error::HarmonizeError;

fn duplicate_events() -> DataFrame {
    df![
        "MonitoringLocationIdentifier" => &["S1", "S1", "S2"],
        "OrganizationIdentifier" => &["ORG", "ORG", "ORG"],
        "ActivityIdentifier" => &["A1", "A1", "A2"],
        "StartDate" => &["2020-07-01", "2020-07-01", "2020-07-02"],
        "Temperature" => &[Some(10.0), Some(11.0), Some(9.0)],
        "QA_Temperature" => &[None, Some("assumed_unit: Temperature MISSING UNITS, degC assumed"), None],
        "Secchi" => &[Some(1.5), None, None],
        "QA_Secchi" => &[None::<&str>, None, None],
    ]
    .expect("df")
}

fn collapse(df: &DataFrame, policy: DuplicatePolicy) -> DataFrame {
    collapse_results(df, &CollapseOptions { policy })
        .expect("collapse")
        .frame
}

#[test]
fn conflicting_duplicates_keep_first_and_flag_the_other() {
    let output = collapse_results(&duplicate_events(), &CollapseOptions::default()).expect("collapse");
    let frame = &output.frame;

    assert_eq!(frame.height(), 2);

    let temperature = frame.column("Temperature").expect("Temperature").f64().expect("f64");
    assert_eq!(temperature.get(0), Some(10.0));
    assert_eq!(temperature.get(1), Some(9.0));

    let secchi = frame.column("Secchi").expect("Secchi").f64().expect("f64");
    assert_eq!(secchi.get(0), Some(1.5));

    let qa = frame.column("QA_Temperature").expect("QA").str().expect("str");
    let flags = qa.get(0).expect("flags present");
    assert!(flags.starts_with("assumed_unit"), "{flags}");
    assert!(flags.contains("duplicate_conflict: Temperature kept 10"), "{flags}");
    assert!(flags.contains("discarded 11"), "{flags}");
    assert_eq!(qa.get(1), None);

    assert_eq!(output.conflicts.len(), 1);
    assert_eq!(output.conflicts[0].column, "Temperature");
    assert!(output.conflicts[0].kept.starts_with("10"));
    assert_eq!(output.conflicts[0].discarded.len(), 1);
    assert!(output.conflicts[0].discarded[0].starts_with("11"));
}

#[test]
fn keep_last_policy_is_configurable() {
    let frame = collapse(&duplicate_events(), DuplicatePolicy::KeepLast);
    let temperature = frame.column("Temperature").expect("Temperature").f64().expect("f64");
    assert_eq!(temperature.get(0), Some(11.0));

    let qa = frame.column("QA_Temperature").expect("QA").str().expect("str");
    assert!(qa.get(0).expect("flags").contains("discarded 10"));
}

#[test]
fn primary_record_beats_quality_control() {
    let df = df![
        "MonitoringLocationIdentifier" => &["S1", "S1"],
        "OrganizationIdentifier" => &["ORG", "ORG"],
        "ActivityIdentifier" => &["A1", "A1"],
        "StartDate" => &["2020-07-01", "2020-07-01"],
        "ActivityTypeCode" => &["Quality Control Sample-Field Replicate", "Sample-Routine"],
        "DO" => &[7.9, 8.1],
        "QA_DO" => &[None::<&str>, None],
    ]
    .expect("df");

    let frame = collapse(&df, DuplicatePolicy::KeepFirst);
    assert_eq!(frame.height(), 1);
    let oxygen = frame.column("DO").expect("DO").f64().expect("f64");
    assert_eq!(oxygen.get(0), Some(8.1));
    let qa = frame.column("QA_DO").expect("QA_DO").str().expect("str");
    assert!(qa.get(0).expect("flag").contains("discarded 7.9"));

    // The differing type code has no QA companion, so its conflict is kept
    // in the collapse column.
    let collapse_flags = frame.column("QA_collapse").expect("QA_collapse").str().expect("str");
    assert!(collapse_flags
        .get(0)
        .expect("flag")
        .starts_with("duplicate_conflict: ActivityTypeCode kept Sample-Routine"));
}

#[test]
fn agreeing_duplicates_merge_silently() {
    let df = df![
        "MonitoringLocationIdentifier" => &["S1", "S1"],
        "OrganizationIdentifier" => &["ORG", "ORG"],
        "ActivityIdentifier" => &["A1", "A1"],
        "StartDate" => &["2020-07-01", "2020-07-01"],
        "pH" => &[Some(7.2), Some(7.2)],
        "QA_pH" => &[None::<&str>, None],
    ]
    .expect("df");

    let output = collapse_results(&df, &CollapseOptions::default()).expect("collapse");
    assert_eq!(output.frame.height(), 1);
    assert!(output.conflicts.is_empty());
    assert!(output.frame.column("QA_collapse").is_err());
    assert_eq!(output.frame.column("QA_pH").expect("QA_pH").null_count(), 1);
}

#[test]
fn collapse_is_idempotent() {
    let once = collapse(&duplicate_events(), DuplicatePolicy::KeepFirst);
    let twice = collapse(&once, DuplicatePolicy::KeepFirst);
    assert!(once.equals_missing(&twice), "{once}\n{twice}");
}

#[test]
fn instants_group_before_dates() {
    let df = df![
        "MonitoringLocationIdentifier" => &["S1", "S1", "S1"],
        "OrganizationIdentifier" => &["ORG", "ORG", "ORG"],
        "ActivityIdentifier" => &["A1", "A1", "A1"],
        "Activity_datetime" => &[Some("2020-07-01 12:00:00"), Some("2020-07-01 13:00:00"), None],
        "StartDate" => &["2020-07-01", "2020-07-01", "2020-07-01"],
        "Temperature" => &[Some(10.0), None, None],
        "Secchi" => &[None, Some(1.0), Some(2.0)],
    ]
    .expect("df");

    let frame = collapse(&df, DuplicatePolicy::KeepFirst);
    assert_eq!(frame.height(), 3);
}

#[test]
fn activity_claimed_by_two_organizations_is_rejected() {
    let df = df![
        "MonitoringLocationIdentifier" => &["S1", "S1"],
        "OrganizationIdentifier" => &["ORG-A", "ORG-B"],
        "ActivityIdentifier" => &["A1", "A1"],
        "StartDate" => &["2020-07-01", "2020-07-01"],
        "Temperature" => &[10.0, 10.0],
    ]
    .expect("df");

    let err = collapse_results(&df, &CollapseOptions::default()).expect_err("conflict");
    match err {
        HarmonizeError::IdentityConflict { activity, field, values } => {
            assert_eq!(activity, "A1");
            assert_eq!(field, "OrganizationIdentifier");
            assert_eq!(values, vec!["ORG-A".to_string(), "ORG-B".to_string()]);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

fn field_blank_then_routine_samples() -> DataFrame {
    df![
        "MonitoringLocationIdentifier" => &["S1", "S1", "S1"],
        "OrganizationIdentifier" => &["ORG", "ORG", "ORG"],
        "ActivityIdentifier" => &["A1", "A1", "A1"],
        "StartDate" => &["2020-07-01", "2020-07-01", "2020-07-01"],
        "ActivityTypeCode" => &[
            "Quality Control Sample-Field Blank",
            "Sample-Routine",
            "Sample-Routine",
        ],
        "DO" => &[0.1, 8.1, 8.3],
        "QA_DO" => &[None::<&str>, None, None],
    ]
    .expect("df")
}

#[test]
fn disagreeing_primary_records_still_outrank_quality_control() {
    let output = collapse_results(&field_blank_then_routine_samples(), &CollapseOptions::default())
        .expect("collapse");
    let oxygen = output.frame.column("DO").expect("DO").f64().expect("f64");
    assert_eq!(oxygen.get(0), Some(8.1));

    let qa = output.frame.column("QA_DO").expect("QA_DO").str().expect("str");
    let flags = qa.get(0).expect("flag");
    assert!(flags.contains("DO kept 8.1"), "{flags}");
    assert!(flags.contains("0.1"), "{flags}");
    assert!(flags.contains("8.3"), "{flags}");

    let last = collapse(&field_blank_then_routine_samples(), DuplicatePolicy::KeepLast);
    let oxygen = last.column("DO").expect("DO").f64().expect("f64");
    assert_eq!(oxygen.get(0), Some(8.3));
}

#[test]
fn quality_control_values_are_used_when_nothing_else_exists() {
    let df = df![
        "MonitoringLocationIdentifier" => &["S1", "S1", "S1"],
        "OrganizationIdentifier" => &["ORG", "ORG", "ORG"],
        "ActivityIdentifier" => &["A1", "A1", "A1"],
        "StartDate" => &["2020-07-01", "2020-07-01", "2020-07-01"],
        "ActivityTypeCode" => &[
            "Quality Control Sample-Field Blank",
            "Quality Control Sample-Field Replicate",
            "Sample-Routine",
        ],
        "DO" => &[Some(0.1), Some(0.2), None],
    ]
    .expect("df");

    let frame = collapse(&df, DuplicatePolicy::KeepLast);
    let oxygen = frame.column("DO").expect("DO").f64().expect("f64");
    assert_eq!(oxygen.get(0), Some(0.2));
}

#[test]
fn activity_claimed_by_two_locations_is_rejected() {
    let df = df![
        "MonitoringLocationIdentifier" => &["S1", "S2"],
        "OrganizationIdentifier" => &["ORG", "ORG"],
        "ActivityIdentifier" => &["A1", "A1"],
        "StartDate" => &["2020-07-01", "2020-07-01"],
        "Temperature" => &[10.0, 10.0],
    ]
    .expect("df");

    let err = collapse_results(&df, &CollapseOptions::default()).expect_err("conflict");
    match err {
        HarmonizeError::IdentityConflict { activity, field, values } => {
            assert_eq!(activity, "A1");
            assert_eq!(field, "MonitoringLocationIdentifier");
            assert_eq!(values, vec!["S1".to_string(), "S2".to_string()]);
        }
        other => panic!("unexpected error {other:?}"),
    }
}
