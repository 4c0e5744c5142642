use polars::prelude::*;

use wqharmony_core::config::{ErrorMode, HarmonizeConfig};
use wqharmony_core::error::HarmonizeError;
use wqharmony_core::harmonize::{column_name, harmonize, PassThroughColumns};
use wqharmony_core::qa::QaCode;
use wqharmony_core::rulebook::Rulebook;
use wqharmony_core::units::UnitRegistry;

fn raw_results() -> DataFrame {
    df![
        "OrganizationIdentifier" => &["ORG", "ORG", "ORG", "ORG"],
        "ActivityIdentifier" => &["A1", "A1", "A2", "A2"],
        "MonitoringLocationIdentifier" => &["S1", "S1", "S2", "S2"],
        "CharacteristicName" => &["Temperature, water", "Chloride", "Phosphorus", "Temperature, water"],
        "ResultMeasureValue" => &[Some("20"), Some("12"), Some("0.05"), Some("n/a")],
        "ResultMeasure/MeasureUnitCode" => &[Some("deg C"), Some("mg/L"), Some("mg/l as P"), None],
        "ResultSampleFractionText" => &[None, None, Some("Total"), None::<&str>],
    ]
    .expect("df")
}

fn config(errors: ErrorMode) -> HarmonizeConfig {
    HarmonizeConfig {
        errors,
        ..HarmonizeConfig::default()
    }
}

#[test]
fn every_row_gets_exactly_one_result() {
    let df = raw_results();
    let output = harmonize(
        &df,
        &Rulebook::standard(),
        &UnitRegistry::standard(),
        &config(ErrorMode::Warn),
    )
    .expect("harmonize");

    assert_eq!(output.frame.height(), df.height());
    assert_eq!(output.results.len(), df.height());
    for (idx, result) in output.results.iter().enumerate() {
        assert_eq!(result.row, idx);
    }

    let placements = output
        .frame
        .column("Result_column")
        .expect("Result_column")
        .str()
        .expect("str")
        .into_iter()
        .collect::<Vec<_>>();
    assert_eq!(
        placements,
        vec![
            Some("Temperature"),
            Some("Chloride"),
            Some("TP_Phosphorus"),
            Some("Temperature"),
        ]
    );

    let temperature = output.frame.column("Temperature").expect("Temperature").f64().expect("f64");
    assert_eq!(temperature.get(0), Some(20.0));
    assert_eq!(temperature.get(1), None);
    assert_eq!(temperature.get(3), None);

    let phosphorus = output.frame.column("TP_Phosphorus").expect("TP").f64().expect("f64");
    assert_eq!(phosphorus.get(2), Some(0.05));

    let speciation = output.frame.column("Speciation").expect("Speciation").str().expect("str");
    assert_eq!(speciation.get(2), Some("P"));

    assert_eq!(output.units.get("Temperature").map(String::as_str), Some("degC"));
    assert_eq!(output.units.get("TP_Phosphorus").map(String::as_str), Some("mg/l"));
    assert!(!output.units.contains_key("Chloride"));
}

#[test]
fn qa_flags_are_recorded_per_row() {
    let output = harmonize(
        &raw_results(),
        &Rulebook::standard(),
        &UnitRegistry::standard(),
        &config(ErrorMode::Warn),
    )
    .expect("harmonize");

    let qa = output.frame.column("QA_flag").expect("QA_flag").str().expect("str");
    assert_eq!(qa.get(0), None);
    assert!(qa.get(1).expect("flag").starts_with("unmapped_characteristic"));
    assert_eq!(qa.get(2), None);
    assert!(qa.get(3).expect("flag").starts_with("missing_or_invalid_value"));

    assert_eq!(output.report.flag_count(QaCode::UnmappedCharacteristic), 1);
    assert_eq!(output.report.flag_count(QaCode::MissingOrInvalidValue), 1);
    assert_eq!(output.report.unmapped_characteristics, vec!["Chloride".to_string()]);
}

#[test]
fn unmapped_characteristic_passes_through_in_warn_mode() {
    let output = harmonize(
        &raw_results(),
        &Rulebook::standard(),
        &UnitRegistry::standard(),
        &config(ErrorMode::Warn),
    )
    .expect("harmonize");

    let chloride = output.frame.column("Chloride").expect("Chloride").str().expect("str");
    assert_eq!(chloride.get(1), Some("12"));
    assert_eq!(chloride.get(0), None);
}

#[test]
fn unmapped_characteristic_is_fatal_in_raise_mode() {
    let err = harmonize(
        &raw_results(),
        &Rulebook::standard(),
        &UnitRegistry::standard(),
        &config(ErrorMode::Raise),
    )
    .expect_err("should fail");

    match err {
        HarmonizeError::UnknownCharacteristic { row, characteristic } => {
            assert_eq!(row.row, 1);
            assert_eq!(row.activity.as_deref(), Some("A1"));
            assert_eq!(row.location.as_deref(), Some("S1"));
            assert_eq!(characteristic, "Chloride");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn earlier_flags_are_extended_not_replaced() {
    let df = df![
        "CharacteristicName" => &["pH"],
        "ResultMeasureValue" => &["7.0"],
        "QA_flag" => &["reviewed: manual check"],
    ]
    .expect("df");

    let output = harmonize(
        &df,
        &Rulebook::standard(),
        &UnitRegistry::standard(),
        &HarmonizeConfig::default(),
    )
    .expect("harmonize");

    let qa = output.frame.column("QA_flag").expect("QA_flag").str().expect("str");
    assert_eq!(
        qa.get(0),
        Some("reviewed: manual check|assumed_unit: pH MISSING UNITS, dimensionless assumed")
    );
}

#[test]
fn required_columns_are_checked() {
    let df = df!["CharacteristicName" => &["pH"]].expect("df");
    let err = harmonize(
        &df,
        &Rulebook::standard(),
        &UnitRegistry::standard(),
        &HarmonizeConfig::default(),
    )
    .expect_err("missing value column");
    assert!(matches!(err, HarmonizeError::MissingColumn(name) if name == "ResultMeasureValue"));
}

#[test]
fn unmapped_names_become_column_names() {
    assert_eq!(column_name("Chloride"), "Chloride");
    assert_eq!(column_name("Solids, total dissolved (TDS)"), "Solids_total_dissolved_TDS");
    assert_eq!(column_name("  "), "Unnamed_characteristic");
}

#[test]
fn unmapped_names_never_reuse_an_existing_column() {
    let df = df![
        "CharacteristicName" => &["Organic carbon", "Carbon", "Depth", "QA flag", "Carbon"],
        "ResultMeasureValue" => &["5", "7", "3.5", "1", "8"],
        "ResultMeasure/MeasureUnitCode" => &["mg/l", "mg/l", "m", "count", "mg/l"],
    ]
    .expect("df");
    let mut columns = PassThroughColumns::new(&df, &Rulebook::standard());

    assert_eq!(columns.placement("Carbon"), "Carbon_unmapped");
    assert_eq!(columns.placement("Carbon"), "Carbon_unmapped");
    assert_eq!(columns.placement("Carbon  "), "Carbon_unmapped2");
    assert_eq!(columns.placement("Depth"), "Depth_unmapped");
    assert_eq!(columns.placement("Speciation"), "Speciation_unmapped");
    assert_eq!(columns.placement("QA flag"), "Unmapped_QA_flag");
    assert_eq!(columns.placement("Depth, bottom"), "Unmapped_Depth_bottom");
    assert_eq!(columns.placement("ResultMeasureValue"), "ResultMeasureValue_unmapped");
    assert_eq!(columns.placement("Chloride"), "Chloride");

    let config = HarmonizeConfig {
        errors: ErrorMode::Warn,
        ..HarmonizeConfig::default()
    };
    let output = harmonize(&df, &Rulebook::standard(), &UnitRegistry::standard(), &config)
        .expect("harmonize");
    let placements = output
        .frame
        .column("Result_column")
        .expect("Result_column")
        .str()
        .expect("str")
        .into_iter()
        .collect::<Vec<_>>();
    assert_eq!(
        placements,
        vec![
            Some("Carbon"),
            Some("Carbon_unmapped"),
            Some("Depth_unmapped"),
            Some("Unmapped_QA_flag"),
            Some("Carbon_unmapped"),
        ]
    );

    let carbon = output.frame.column("Carbon").expect("Carbon").f64().expect("f64");
    assert_eq!(carbon.get(0), Some(5.0));
    assert_eq!(carbon.get(1), None);
    let unmapped = output
        .frame
        .column("Carbon_unmapped")
        .expect("Carbon_unmapped")
        .str()
        .expect("str");
    assert_eq!(unmapped.get(1), Some("7"));
    assert_eq!(unmapped.get(4), Some("8"));
}
