//! Unit definitions, the alias-normalizing registry and the dimensionality
//! bridges that move values between unit families.

mod bridge;
mod registry;

use std::fmt;

use thiserror::Error;

pub use bridge::{oxygen_saturation_mg_l, Bridge, ConversionContext};
pub use registry::UnitRegistry;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum UnitError {
    #[error("unrecognized unit '{unit}'")]
    Unrecognized { unit: String },
    #[error("'{from}' ({from_dimension}) is not convertible to '{to}' ({to_dimension})")]
    Dimensionality {
        from: String,
        to: String,
        from_dimension: Dimension,
        to_dimension: Dimension,
    },
    #[error("{bridge:?} conversion is missing context: {detail}")]
    MissingContext { bridge: Bridge, detail: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    /// mass per volume, base mg/l
    MassConcentration,
    /// mass per mass, base kg/kg
    MassFraction,
    /// amount per volume, base mol/l
    SubstanceConcentration,
    /// base degC, affine
    Temperature,
    /// base m
    Length,
    /// nephelometric family, base NTU
    Turbidity,
    JacksonTurbidity,
    SilicaTurbidity,
    /// base uS/cm
    Conductivity,
    /// base CFU/(100ml)
    MicrobialDensity,
    Dimensionless,
}

impl Dimension {
    pub fn base_symbol(self) -> &'static str {
        match self {
            Dimension::MassConcentration => "mg/l",
            Dimension::MassFraction => "kg/kg",
            Dimension::SubstanceConcentration => "mol/l",
            Dimension::Temperature => "degC",
            Dimension::Length => "m",
            Dimension::Turbidity => "NTU",
            Dimension::JacksonTurbidity => "JTU",
            Dimension::SilicaTurbidity => "SiO2",
            Dimension::Conductivity => "uS/cm",
            Dimension::MicrobialDensity => "CFU/(100ml)",
            Dimension::Dimensionless => "dimensionless",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Dimension::MassConcentration => "mass/volume",
            Dimension::MassFraction => "mass/mass",
            Dimension::SubstanceConcentration => "substance/volume",
            Dimension::Temperature => "temperature",
            Dimension::Length => "length",
            Dimension::Turbidity => "turbidity",
            Dimension::JacksonTurbidity => "jackson turbidity",
            Dimension::SilicaTurbidity => "silica turbidity",
            Dimension::Conductivity => "conductivity",
            Dimension::MicrobialDensity => "microbial density",
            Dimension::Dimensionless => "dimensionless",
        };
        f.write_str(label)
    }
}

/// Canonical unit descriptor. A value `v` in this unit is `v * scale + offset`
/// in the dimension's base unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitDef {
    pub symbol: &'static str,
    pub dimension: Dimension,
    pub scale: f64,
    pub offset: f64,
}

impl UnitDef {
    pub const fn linear(symbol: &'static str, dimension: Dimension, scale: f64) -> Self {
        Self {
            symbol,
            dimension,
            scale,
            offset: 0.0,
        }
    }

    pub fn to_base(&self, value: f64) -> f64 {
        value * self.scale + self.offset
    }

    pub fn from_base(&self, value: f64) -> f64 {
        (value - self.offset) / self.scale
    }
}

/// Converts `value` from one unit to another. Same-dimension conversions are
/// purely numeric; anything else must go through one of `bridges`.
pub fn convert(
    value: f64,
    from: &UnitDef,
    to: &UnitDef,
    bridges: &[Bridge],
    ctx: &ConversionContext,
) -> Result<f64, UnitError> {
    if from.symbol == to.symbol {
        return Ok(value);
    }
    let base = from.to_base(value);
    if from.dimension == to.dimension {
        return Ok(to.from_base(base));
    }

    let bridge = bridges
        .iter()
        .find(|bridge| bridge.connects(from.dimension, to.dimension))
        .ok_or_else(|| UnitError::Dimensionality {
            from: from.symbol.to_string(),
            to: to.symbol.to_string(),
            from_dimension: from.dimension,
            to_dimension: to.dimension,
        })?;

    let bridged = bridge.apply(base, from.dimension, to.dimension, ctx)?;
    Ok(to.from_base(bridged))
}
