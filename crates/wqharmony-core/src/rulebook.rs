use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

use crate::units::{Bridge, UnitRegistry};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RulebookError {
    #[error("unknown characteristic '{name}'")]
    UnknownCharacteristic { name: String },
    #[error("output unit '{unit}' for {name} is not usable: {detail}")]
    InvalidOutputUnit {
        name: String,
        unit: String,
        detail: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Numeric,
    Categorical,
}

/// Sample fraction text that gets its own output column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FractionRule {
    pub fraction: &'static str,
    pub column: &'static str,
}

/// Speciation a result can be expressed as, with the molar mass used when a
/// molar unit has to be turned into mass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BasisRule {
    pub label: &'static str,
    pub molar_mass: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CharacteristicRule {
    pub name: &'static str,
    pub column: &'static str,
    pub kind: ValueKind,
    /// Canonical unit; `None` for categorical characteristics.
    pub target_unit: Option<String>,
    pub default_unit: Option<&'static str>,
    pub unit_aliases: &'static [(&'static str, &'static str)],
    pub fractions: &'static [FractionRule],
    /// Column for results whose fraction is blank or not one of `fractions`.
    pub unspecified_fraction: Option<&'static str>,
    pub bases: &'static [BasisRule],
    /// Speciation recorded when neither the unit nor the method names one.
    pub default_basis: Option<&'static str>,
    pub default_molar_mass: Option<f64>,
    pub bridges: &'static [Bridge],
}

impl CharacteristicRule {
    pub fn distinguishes_fractions(&self) -> bool {
        !self.fractions.is_empty()
    }

    pub fn basis(&self, label: &str) -> Option<&BasisRule> {
        self.bases.iter().find(|basis| basis.label == label)
    }

    /// Every column a result of this characteristic can be placed in.
    pub fn placements(&self) -> Vec<&'static str> {
        if self.fractions.is_empty() {
            return vec![self.column];
        }
        let mut placements: Vec<&'static str> =
            self.fractions.iter().map(|fraction| fraction.column).collect();
        if let Some(other) = self.unspecified_fraction {
            placements.push(other);
        }
        placements
    }
}

const BACTERIA_ALIASES: &[(&str, &str)] = &[
    ("#/100ml", "CFU/(100ml)"),
    ("CFU", "CFU/(100ml)"),
    ("MPN", "MPN/(100ml)"),
    ("/100ml", "/(100ml)"),
    ("/100 ml", "/(100ml)"),
];

const PHOSPHORUS_BASES: &[BasisRule] = &[
    BasisRule {
        label: "P",
        molar_mass: 30.97,
    },
    BasisRule {
        label: "PO4",
        molar_mass: 94.97,
    },
];

const NITROGEN_BASES: &[BasisRule] = &[
    BasisRule {
        label: "N",
        molar_mass: 14.01,
    },
    BasisRule {
        label: "NO3",
        molar_mass: 62.01,
    },
    BasisRule {
        label: "NO2",
        molar_mass: 46.01,
    },
    BasisRule {
        label: "NH4",
        molar_mass: 18.04,
    },
    BasisRule {
        label: "NH3",
        molar_mass: 17.03,
    },
];

pub fn canonical_characteristic_rules() -> Vec<CharacteristicRule> {
    use ValueKind::{Categorical, Numeric};

    let numeric = |name: &'static str, column: &'static str, unit: &'static str| {
        CharacteristicRule {
            name,
            column,
            kind: Numeric,
            target_unit: Some(unit.to_string()),
            default_unit: Some(unit),
            unit_aliases: &[],
            fractions: &[],
            unspecified_fraction: None,
            bases: &[],
            default_basis: None,
            default_molar_mass: None,
            bridges: &[],
        }
    };

    vec![
        numeric("Depth, Secchi disk depth", "Secchi", "m"),
        CharacteristicRule {
            unit_aliases: &[("%", "percent"), ("% saturatn", "percent")],
            bridges: &[Bridge::OxygenSaturation],
            ..numeric("Dissolved oxygen (DO)", "DO", "mg/l")
        },
        numeric("Temperature, water", "Temperature", "degC"),
        CharacteristicRule {
            unit_aliases: &[("ppt", "ppth"), ("0/00", "ppth")],
            bridges: &[Bridge::SalinityDensity, Bridge::SalinityConductivity],
            ..numeric("Salinity", "Salinity", "PSU")
        },
        CharacteristicRule {
            unit_aliases: &[("None", "dimensionless"), ("std units", "dimensionless")],
            ..numeric("pH", "pH", "dimensionless")
        },
        CharacteristicRule {
            unit_aliases: &[("%", "percent")],
            bases: NITROGEN_BASES,
            default_basis: Some("N"),
            default_molar_mass: Some(14.01),
            bridges: &[Bridge::WaterDensity, Bridge::MolarMass],
            ..numeric("Nitrogen", "Nitrogen", "mg/l")
        },
        CharacteristicRule {
            unit_aliases: &[("uS", "uS/cm"), ("umho", "umho/cm")],
            ..numeric("Conductivity", "Conductivity", "uS/cm")
        },
        CharacteristicRule {
            unit_aliases: &[("uS", "uS/cm"), ("umho", "umho/cm")],
            ..numeric("Specific conductance", "Conductivity", "uS/cm")
        },
        CharacteristicRule {
            default_unit: None,
            unit_aliases: &[("% by wt", "percent"), ("%", "percent")],
            default_molar_mass: Some(180.16),
            bridges: &[Bridge::WaterDensity, Bridge::MolarMass],
            ..numeric("Organic carbon", "Carbon", "mg/l")
        },
        CharacteristicRule {
            unit_aliases: &[
                ("mg/cm3", "mg/cm**3"),
                ("mg/m3", "mg/m**3"),
                ("mg/m2", "mg/m**3"),
                ("ug/cm3", "ug/cm**3"),
            ],
            ..numeric("Chlorophyll a", "Chlorophyll", "mg/l")
        },
        CharacteristicRule {
            unit_aliases: &[("mg/l SiO2", "SiO2"), ("ppm SiO2", "SiO2")],
            bridges: &[
                Bridge::TurbidityTube,
                Bridge::JacksonTurbidity,
                Bridge::SilicaTurbidity,
            ],
            ..numeric("Turbidity", "Turbidity", "NTU")
        },
        CharacteristicRule {
            default_unit: None,
            unit_aliases: &[("%", "percent")],
            bridges: &[Bridge::WaterDensity],
            ..numeric("Sediment", "Sediment", "g/kg")
        },
        CharacteristicRule {
            unit_aliases: BACTERIA_ALIASES,
            ..numeric("Fecal Coliform", "Fecal_Coliform", "CFU/(100ml)")
        },
        CharacteristicRule {
            unit_aliases: BACTERIA_ALIASES,
            ..numeric("Escherichia coli", "E_coli", "CFU/(100ml)")
        },
        CharacteristicRule {
            fractions: &[
                FractionRule {
                    fraction: "Total",
                    column: "TP_Phosphorus",
                },
                FractionRule {
                    fraction: "Dissolved",
                    column: "TDP_Phosphorus",
                },
            ],
            unspecified_fraction: Some("Other_Phosphorus"),
            bases: PHOSPHORUS_BASES,
            default_basis: Some("P"),
            default_molar_mass: Some(30.97),
            bridges: &[Bridge::WaterDensity, Bridge::MolarMass],
            ..numeric("Phosphorus", "Phosphorus", "mg/l")
        },
        CharacteristicRule {
            name: "Weather condition (WMO code 4501)",
            column: "Weather",
            kind: Categorical,
            target_unit: None,
            default_unit: None,
            unit_aliases: &[],
            fractions: &[],
            unspecified_fraction: None,
            bases: &[],
            default_basis: None,
            default_molar_mass: None,
            bridges: &[],
        },
    ]
}

/// Characteristic name -> rule. Immutable once built.
#[derive(Debug, Clone)]
pub struct Rulebook {
    rules: Vec<CharacteristicRule>,
    by_name: HashMap<&'static str, usize>,
}

impl Rulebook {
    pub fn standard() -> Self {
        Self::new(canonical_characteristic_rules())
    }

    pub fn new(rules: Vec<CharacteristicRule>) -> Self {
        let by_name = rules
            .iter()
            .enumerate()
            .map(|(idx, rule)| (rule.name, idx))
            .collect();
        Self { rules, by_name }
    }

    pub fn lookup(&self, name: &str) -> Result<&CharacteristicRule, RulebookError> {
        self.by_name
            .get(name.trim())
            .map(|&idx| &self.rules[idx])
            .ok_or_else(|| RulebookError::UnknownCharacteristic {
                name: name.to_string(),
            })
    }

    pub fn rules(&self) -> &[CharacteristicRule] {
        &self.rules
    }

    /// Replaces canonical units, keyed by characteristic name or output
    /// column. Each replacement must be a registered unit of the same
    /// dimension as the unit it replaces.
    pub fn with_output_units(
        mut self,
        overrides: &BTreeMap<String, String>,
        registry: &UnitRegistry,
    ) -> Result<Self, RulebookError> {
        for (key, unit) in overrides {
            let matching: Vec<usize> = self
                .rules
                .iter()
                .enumerate()
                .filter(|(_, rule)| rule.name == key.as_str() || rule.column == key.as_str())
                .map(|(idx, _)| idx)
                .collect();
            if matching.is_empty() {
                return Err(RulebookError::UnknownCharacteristic { name: key.clone() });
            }

            let invalid = |detail: String| RulebookError::InvalidOutputUnit {
                name: key.clone(),
                unit: unit.clone(),
                detail,
            };
            let replacement = registry
                .lookup(unit)
                .map_err(|err| invalid(err.to_string()))?;

            for idx in matching {
                let rule = &mut self.rules[idx];
                let current = rule
                    .target_unit
                    .as_deref()
                    .and_then(|symbol| registry.get(symbol))
                    .ok_or_else(|| invalid("characteristic has no numeric unit".to_string()))?;
                if current.dimension != replacement.dimension {
                    return Err(invalid(format!(
                        "expected a {} unit, got {}",
                        current.dimension, replacement.dimension
                    )));
                }
                rule.target_unit = Some(replacement.symbol.to_string());
            }
        }
        Ok(self)
    }
}

impl Default for Rulebook {
    fn default() -> Self {
        Self::standard()
    }
}
