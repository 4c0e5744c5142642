use wqharmony_core::config::{DuplicatePolicy, ErrorMode, HarmonizeConfig};
use wqharmony_core::error::HarmonizeError;

#[test]
fn defaults_apply_to_missing_keys() {
    let config = HarmonizeConfig::from_toml_str("").expect("empty config");
    assert_eq!(config, HarmonizeConfig::default());
    assert_eq!(config.errors, ErrorMode::Raise);
    assert_eq!(config.duplicate_policy, DuplicatePolicy::KeepFirst);
    assert_eq!(config.water_density_kg_per_l, 1.0);
}

#[test]
fn toml_overrides_are_read() {
    let config = HarmonizeConfig::from_toml_str(
        r#"
errors = "warn"
duplicate_policy = "keep_last"
reference_temperature_c = 20.0

[output_units]
DO = "ug/l"
"#,
    )
    .expect("config");

    assert_eq!(config.errors, ErrorMode::Warn);
    assert_eq!(config.duplicate_policy, DuplicatePolicy::KeepLast);
    assert_eq!(config.reference_temperature_c, 20.0);
    assert_eq!(config.output_units.get("DO").map(String::as_str), Some("ug/l"));
    assert_eq!(config.conversion_context().temperature_c, 20.0);
}

#[test]
fn invalid_values_are_rejected() {
    assert!(matches!(
        HarmonizeConfig::from_toml_str("errors = \"sometimes\""),
        Err(HarmonizeError::Config(_))
    ));
    assert!(matches!(
        HarmonizeConfig::from_toml_str("water_density_kg_per_l = 0.0"),
        Err(HarmonizeError::Config(_))
    ));
    assert!(matches!(
        HarmonizeConfig::from_toml_str("colour = \"blue\""),
        Err(HarmonizeError::Config(_))
    ));
}

#[test]
fn errors_mode_parses_from_cli_text() {
    assert_eq!("RAISE".parse::<ErrorMode>().expect("raise"), ErrorMode::Raise);
    assert_eq!("skip".parse::<ErrorMode>().expect("skip"), ErrorMode::Warn);
    assert_eq!("ignore".parse::<ErrorMode>().expect("ignore"), ErrorMode::Ignore);
    assert!("loud".parse::<ErrorMode>().is_err());
}
