use polars::prelude::*;

use wqharmony_core::checks::{check_precision, decimal_digits, wet_dry_checks};
use wqharmony_core::error::HarmonizeError;

#[test]
fn decimal_digits_count_what_was_reported() {
    assert_eq!(decimal_digits("7"), 0);
    assert_eq!(decimal_digits("7.10"), 2);
    assert_eq!(decimal_digits(" 0.125 "), 3);
    assert_eq!(decimal_digits("1.5e-3"), 1);
}

fn harmonized() -> DataFrame {
    df![
        "ResultMeasureValue" => &[Some("7.125"), Some("7.1"), Some("8"), Some("n/a"), Some("1.5")],
        "Result_column" => &["pH", "pH", "pH", "pH", "Temperature"],
        "QA_flag" => &[None, Some("assumed_unit: pH MISSING UNITS, dimensionless assumed"), None, None, None],
    ]
    .expect("df")
}

#[test]
fn imprecise_values_are_flagged_for_their_column_only() {
    let output = check_precision(&harmonized(), "pH", 3).expect("precision");
    let qa = output.column("QA_flag").expect("QA_flag").str().expect("str");

    assert_eq!(qa.get(0), None);
    assert_eq!(
        qa.get(1),
        Some("assumed_unit: pH MISSING UNITS, dimensionless assumed|imprecise: pH fewer than 3 decimal digits")
    );
    assert_eq!(qa.get(2), Some("imprecise: pH fewer than 3 decimal digits"));
    assert_eq!(qa.get(3), None, "unparsable values are not precision issues");
    assert_eq!(qa.get(4), None);

    let values = output.column("ResultMeasureValue").expect("values").str().expect("str");
    assert_eq!(values.get(2), Some("8"));
}

#[test]
fn precision_check_needs_placements() {
    let df = df!["ResultMeasureValue" => &["1.0"]].expect("df");
    let err = check_precision(&df, "pH", 2).expect_err("missing placements");
    assert!(matches!(err, HarmonizeError::MissingColumn(name) if name == "Result_column"));
}

#[test]
fn dry_bed_sediment_reported_as_water_is_corrected() {
    let df = df![
        "ActivityMediaName" => &["Water", "Water", "Sediment"],
        "ResultSampleFractionText" => &[Some("Bed Sediment"), Some("Total"), Some("Bed Sediment")],
        "ResultWeightBasisText" => &[Some("Dry"), Some("Dry"), Some("Dry")],
    ]
    .expect("df");

    let output = wet_dry_checks(&df).expect("wet/dry");
    let media = output.column("ActivityMediaName").expect("media").str().expect("str");
    assert_eq!(media.get(0), Some("Sediment"));
    assert_eq!(media.get(1), Some("Water"));
    assert_eq!(media.get(2), Some("Sediment"));

    let qa = output.column("QA_flag").expect("QA_flag").str().expect("str");
    assert_eq!(qa.get(0), Some("media_corrected: ActivityMediaName Water changed to Sediment"));
    assert_eq!(qa.get(1), None);
    assert_eq!(qa.get(2), None);
}

#[test]
fn wet_dry_checks_skip_tables_without_media() {
    let df = df!["ResultSampleFractionText" => &["Bed Sediment"]].expect("df");
    let output = wet_dry_checks(&df).expect("wet/dry");
    assert!(output.equals_missing(&df));
}
