use std::collections::HashMap;

use super::{Dimension, UnitDef, UnitError};

/// Unit table plus the alias step that runs before strict lookup. Built once
/// and shared read-only.
#[derive(Debug, Clone)]
pub struct UnitRegistry {
    units: HashMap<&'static str, UnitDef>,
    folded: HashMap<String, Vec<&'static str>>,
    aliases: HashMap<String, &'static str>,
}

fn unit_definitions() -> Vec<UnitDef> {
    use Dimension::*;

    let fahrenheit = UnitDef {
        symbol: "degF",
        dimension: Temperature,
        scale: 5.0 / 9.0,
        offset: -32.0 * 5.0 / 9.0,
    };
    let kelvin = UnitDef {
        symbol: "K",
        dimension: Temperature,
        scale: 1.0,
        offset: -273.15,
    };

    vec![
        // mass / volume
        UnitDef::linear("mg/l", MassConcentration, 1.0),
        UnitDef::linear("ug/l", MassConcentration, 1e-3),
        UnitDef::linear("ng/l", MassConcentration, 1e-6),
        UnitDef::linear("g/l", MassConcentration, 1e3),
        UnitDef::linear("mg/ml", MassConcentration, 1e3),
        UnitDef::linear("ug/ml", MassConcentration, 1.0),
        UnitDef::linear("mg/cm**3", MassConcentration, 1e3),
        UnitDef::linear("ug/cm**3", MassConcentration, 1.0),
        UnitDef::linear("g/m**3", MassConcentration, 1.0),
        UnitDef::linear("mg/m**3", MassConcentration, 1e-3),
        UnitDef::linear("ug/m**3", MassConcentration, 1e-6),
        UnitDef::linear("kg/m**3", MassConcentration, 1e3),
        // mass / mass
        UnitDef::linear("kg/kg", MassFraction, 1.0),
        UnitDef::linear("g/kg", MassFraction, 1e-3),
        UnitDef::linear("mg/kg", MassFraction, 1e-6),
        UnitDef::linear("ug/kg", MassFraction, 1e-9),
        UnitDef::linear("mg/g", MassFraction, 1e-3),
        UnitDef::linear("ug/g", MassFraction, 1e-6),
        UnitDef::linear("percent", MassFraction, 1e-2),
        UnitDef::linear("ppth", MassFraction, 1e-3),
        UnitDef::linear("ppm", MassFraction, 1e-6),
        UnitDef::linear("ppb", MassFraction, 1e-9),
        UnitDef::linear("PSU", MassFraction, 1e-3),
        UnitDef::linear("PSS", MassFraction, 1e-3),
        // substance / volume
        UnitDef::linear("mol/l", SubstanceConcentration, 1.0),
        UnitDef::linear("mmol/l", SubstanceConcentration, 1e-3),
        UnitDef::linear("umol/l", SubstanceConcentration, 1e-6),
        UnitDef::linear("nmol/l", SubstanceConcentration, 1e-9),
        // temperature
        UnitDef::linear("degC", Temperature, 1.0),
        fahrenheit,
        kelvin,
        // length
        UnitDef::linear("m", Length, 1.0),
        UnitDef::linear("cm", Length, 1e-2),
        UnitDef::linear("mm", Length, 1e-3),
        UnitDef::linear("km", Length, 1e3),
        UnitDef::linear("ft", Length, 0.3048),
        UnitDef::linear("in", Length, 0.0254),
        UnitDef::linear("yd", Length, 0.9144),
        // turbidity
        UnitDef::linear("NTU", Turbidity, 1.0),
        UnitDef::linear("NTRU", Turbidity, 1.0),
        UnitDef::linear("NTMU", Turbidity, 1.0),
        UnitDef::linear("FNU", Turbidity, 1.0),
        UnitDef::linear("FNRU", Turbidity, 1.0),
        UnitDef::linear("FTU", Turbidity, 1.0),
        UnitDef::linear("FAU", Turbidity, 1.0),
        UnitDef::linear("JTU", JacksonTurbidity, 1.0),
        UnitDef::linear("SiO2", SilicaTurbidity, 1.0),
        // conductivity
        UnitDef::linear("uS/cm", Conductivity, 1.0),
        UnitDef::linear("mS/cm", Conductivity, 1e3),
        UnitDef::linear("S/m", Conductivity, 1e4),
        UnitDef::linear("mS/m", Conductivity, 10.0),
        UnitDef::linear("umho/cm", Conductivity, 1.0),
        UnitDef::linear("mmho/cm", Conductivity, 1e3),
        // microbial density
        UnitDef::linear("CFU/(100ml)", MicrobialDensity, 1.0),
        UnitDef::linear("MPN/(100ml)", MicrobialDensity, 1.0),
        UnitDef::linear("/(100ml)", MicrobialDensity, 1.0),
        UnitDef::linear("CFU/ml", MicrobialDensity, 100.0),
        UnitDef::linear("MPN/ml", MicrobialDensity, 100.0),
        UnitDef::linear("CFU/l", MicrobialDensity, 0.1),
        // dimensionless
        UnitDef::linear("dimensionless", Dimensionless, 1.0),
    ]
}

/// Spellings seen in the raw data that map onto a registry symbol regardless
/// of characteristic. Keys are compared case-insensitively.
fn global_aliases() -> Vec<(&'static str, &'static str)> {
    vec![
        ("deg c", "degC"),
        ("deg f", "degF"),
        ("deg k", "K"),
        ("%", "percent"),
        ("ppt", "ppth"),
        ("mg/m3", "mg/m**3"),
        ("ug/m3", "ug/m**3"),
        ("g/m3", "g/m**3"),
        ("kg/m3", "kg/m**3"),
        ("mg/cm3", "mg/cm**3"),
        ("ug/cm3", "ug/cm**3"),
        ("umho", "umho/cm"),
        ("us/cm @25c", "uS/cm"),
        ("cfu/100ml", "CFU/(100ml)"),
        ("cfu/100 ml", "CFU/(100ml)"),
        ("mpn/100ml", "MPN/(100ml)"),
        ("mpn/100 ml", "MPN/(100ml)"),
        ("#/100ml", "CFU/(100ml)"),
        ("/100ml", "/(100ml)"),
        ("/100 ml", "/(100ml)"),
        ("std units", "dimensionless"),
        ("su", "dimensionless"),
        ("unitless", "dimensionless"),
        ("none", "dimensionless"),
        ("meters", "m"),
        ("feet", "ft"),
    ]
}

impl UnitRegistry {
    pub fn standard() -> Self {
        Self::from_parts(unit_definitions(), global_aliases())
    }

    pub fn from_parts(
        definitions: Vec<UnitDef>,
        aliases: Vec<(&'static str, &'static str)>,
    ) -> Self {
        let mut units = HashMap::with_capacity(definitions.len());
        let mut folded: HashMap<String, Vec<&'static str>> = HashMap::new();
        for def in definitions {
            folded
                .entry(def.symbol.to_lowercase())
                .or_default()
                .push(def.symbol);
            units.insert(def.symbol, def);
        }
        let aliases = aliases
            .into_iter()
            .map(|(from, to)| (from.to_lowercase(), to))
            .collect();

        Self {
            units,
            folded,
            aliases,
        }
    }

    /// Strict lookup by canonical symbol.
    pub fn get(&self, symbol: &str) -> Option<&UnitDef> {
        self.units.get(symbol)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.units.contains_key(symbol)
    }

    /// Resolves a raw unit string with the registry's own aliases.
    pub fn lookup(&self, raw: &str) -> Result<&UnitDef, UnitError> {
        self.resolve(raw, &[])
    }

    /// Resolves a raw unit string: trim, characteristic aliases, global
    /// aliases, strict lookup, then a case-insensitive match that must be
    /// unique.
    pub fn resolve(
        &self,
        raw: &str,
        characteristic_aliases: &[(&str, &str)],
    ) -> Result<&UnitDef, UnitError> {
        let unrecognized = || UnitError::Unrecognized {
            unit: raw.to_string(),
        };

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(unrecognized());
        }

        let key = characteristic_aliases
            .iter()
            .find(|(from, _)| *from == trimmed)
            .map(|(_, to)| *to)
            .unwrap_or(trimmed);
        let key = self
            .aliases
            .get(&key.to_lowercase())
            .copied()
            .unwrap_or(key);

        if let Some(def) = self.units.get(key) {
            return Ok(def);
        }

        match self.folded.get(&key.to_lowercase()).map(Vec::as_slice) {
            Some([only]) => self.units.get(only).ok_or_else(unrecognized),
            _ => Err(unrecognized()),
        }
    }

    pub fn symbols(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.units.keys().copied()
    }
}

impl Default for UnitRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
