use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{HarmonizeError, Result};
use crate::units::ConversionContext;

/// How conversion failures and unmapped characteristics are handled.
/// Value-level issues are always recorded as QA flags, whatever the mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorMode {
    /// Stop the batch on the first fatal issue.
    #[default]
    Raise,
    /// Flag and keep the unconverted value.
    Warn,
    /// Flag and null the value.
    Ignore,
}

impl FromStr for ErrorMode {
    type Err = HarmonizeError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "raise" => Ok(ErrorMode::Raise),
            "warn" | "skip" => Ok(ErrorMode::Warn),
            "ignore" => Ok(ErrorMode::Ignore),
            other => Err(HarmonizeError::Config(format!(
                "unknown errors mode '{other}' (expected raise, warn or ignore)"
            ))),
        }
    }
}

/// Which value survives when duplicate rows disagree and neither is marked
/// as the primary record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    #[default]
    KeepFirst,
    KeepLast,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarmonizeConfig {
    pub errors: ErrorMode,
    pub duplicate_policy: DuplicatePolicy,
    pub water_density_kg_per_l: f64,
    pub reference_temperature_c: f64,
    pub reference_pressure_atm: f64,
    pub depth_unit: String,
    pub output_units: BTreeMap<String, String>,
    /// Output column -> minimum decimal digits a reported value should have.
    pub precision: BTreeMap<String, usize>,
}

impl Default for HarmonizeConfig {
    fn default() -> Self {
        Self {
            errors: ErrorMode::default(),
            duplicate_policy: DuplicatePolicy::default(),
            water_density_kg_per_l: 1.0,
            reference_temperature_c: 25.0,
            reference_pressure_atm: 1.0,
            depth_unit: "m".to_string(),
            output_units: BTreeMap::new(),
            precision: BTreeMap::new(),
        }
    }
}

impl HarmonizeConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: HarmonizeConfig =
            toml::from_str(contents).map_err(|err| HarmonizeError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.water_density_kg_per_l > 0.0) {
            return Err(HarmonizeError::Config(format!(
                "water_density_kg_per_l must be positive, got {}",
                self.water_density_kg_per_l
            )));
        }
        if !(self.reference_pressure_atm > 0.0) {
            return Err(HarmonizeError::Config(format!(
                "reference_pressure_atm must be positive, got {}",
                self.reference_pressure_atm
            )));
        }
        Ok(())
    }

    pub fn conversion_context(&self) -> ConversionContext {
        ConversionContext {
            water_density_kg_per_l: self.water_density_kg_per_l,
            temperature_c: self.reference_temperature_c,
            pressure_atm: self.reference_pressure_atm,
            molar_mass_g_per_mol: None,
        }
    }
}
