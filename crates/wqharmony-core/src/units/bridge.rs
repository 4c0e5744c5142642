use super::{Dimension, UnitError};

/// Named rules that move a value between unit families which are not related
/// by a scale factor. A characteristic must opt into each bridge it allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bridge {
    /// mass/mass <-> mass/volume assuming the sample has the density of water
    WaterDensity,
    /// substance/volume <-> mass/volume through the basis molar mass
    MolarMass,
    /// percent saturation <-> mg/l at the reference temperature and pressure
    OxygenSaturation,
    /// mass/volume -> practical salinity (one way)
    SalinityDensity,
    /// conductivity -> practical salinity, PSS-78 (one way)
    SalinityConductivity,
    /// transparency tube length <-> NTU
    TurbidityTube,
    /// JTU -> NTU (one way)
    JacksonTurbidity,
    /// silica standard -> NTU (one way)
    SilicaTurbidity,
}

/// Explicit assumptions the bridges are allowed to use. Nothing is guessed
/// beyond what is set here.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionContext {
    pub water_density_kg_per_l: f64,
    pub temperature_c: f64,
    pub pressure_atm: f64,
    pub molar_mass_g_per_mol: Option<f64>,
}

impl Default for ConversionContext {
    fn default() -> Self {
        Self {
            water_density_kg_per_l: 1.0,
            temperature_c: 25.0,
            pressure_atm: 1.0,
            molar_mass_g_per_mol: None,
        }
    }
}

impl ConversionContext {
    pub fn with_molar_mass(&self, molar_mass: Option<f64>) -> Self {
        Self {
            molar_mass_g_per_mol: molar_mass,
            ..self.clone()
        }
    }
}

impl Bridge {
    pub fn connects(self, from: Dimension, to: Dimension) -> bool {
        use Dimension::*;
        matches!(
            (self, from, to),
            (Bridge::WaterDensity, MassFraction, MassConcentration)
                | (Bridge::WaterDensity, MassConcentration, MassFraction)
                | (Bridge::MolarMass, SubstanceConcentration, MassConcentration)
                | (Bridge::MolarMass, MassConcentration, SubstanceConcentration)
                | (Bridge::OxygenSaturation, MassFraction, MassConcentration)
                | (Bridge::OxygenSaturation, MassConcentration, MassFraction)
                | (Bridge::SalinityDensity, MassConcentration, MassFraction)
                | (Bridge::SalinityConductivity, Conductivity, MassFraction)
                | (Bridge::TurbidityTube, Length, Turbidity)
                | (Bridge::TurbidityTube, Turbidity, Length)
                | (Bridge::JacksonTurbidity, JacksonTurbidity, Turbidity)
                | (Bridge::SilicaTurbidity, SilicaTurbidity, Turbidity)
        )
    }

    /// `value` is in the base unit of `from`; the result is in the base unit
    /// of `to`.
    pub fn apply(
        self,
        value: f64,
        from: Dimension,
        to: Dimension,
        ctx: &ConversionContext,
    ) -> Result<f64, UnitError> {
        use Dimension::*;
        match (self, from, to) {
            (Bridge::WaterDensity, MassFraction, MassConcentration) => {
                Ok(value * self.density(ctx)? * 1e6)
            }
            (Bridge::WaterDensity, MassConcentration, MassFraction) => {
                Ok(value / (self.density(ctx)? * 1e6))
            }
            (Bridge::MolarMass, SubstanceConcentration, MassConcentration) => {
                Ok(value * self.molar_mass(ctx)? * 1000.0)
            }
            (Bridge::MolarMass, MassConcentration, SubstanceConcentration) => {
                Ok(value / (self.molar_mass(ctx)? * 1000.0))
            }
            (Bridge::OxygenSaturation, MassFraction, MassConcentration) => {
                Ok(value * oxygen_saturation_mg_l(ctx.temperature_c, ctx.pressure_atm))
            }
            (Bridge::OxygenSaturation, MassConcentration, MassFraction) => {
                Ok(value / oxygen_saturation_mg_l(ctx.temperature_c, ctx.pressure_atm))
            }
            (Bridge::SalinityDensity, MassConcentration, MassFraction) => {
                Ok(density_to_psu(value / 1000.0) * 1e-3)
            }
            (Bridge::SalinityConductivity, Conductivity, MassFraction) => {
                Ok(conductivity_to_psu(value, ctx.temperature_c) * 1e-3)
            }
            (Bridge::TurbidityTube, Length, Turbidity) => {
                let cm = self.positive(value * 100.0)?;
                Ok(3941.8 * cm.powf(-1.509))
            }
            (Bridge::TurbidityTube, Turbidity, Length) => {
                let ntu = self.positive(value)?;
                Ok(241.27 * ntu.powf(-0.662) / 100.0)
            }
            (Bridge::JacksonTurbidity, JacksonTurbidity, Turbidity) => Ok(19.025 * value - 0.0477),
            (Bridge::SilicaTurbidity, SilicaTurbidity, Turbidity) => Ok(7.6028 * value - 0.0327),
            _ => Err(UnitError::Dimensionality {
                from: from.base_symbol().to_string(),
                to: to.base_symbol().to_string(),
                from_dimension: from,
                to_dimension: to,
            }),
        }
    }

    fn density(self, ctx: &ConversionContext) -> Result<f64, UnitError> {
        if ctx.water_density_kg_per_l > 0.0 {
            Ok(ctx.water_density_kg_per_l)
        } else {
            Err(UnitError::MissingContext {
                bridge: self,
                detail: format!("water density must be positive, got {}", ctx.water_density_kg_per_l),
            })
        }
    }

    fn molar_mass(self, ctx: &ConversionContext) -> Result<f64, UnitError> {
        ctx.molar_mass_g_per_mol
            .filter(|mass| *mass > 0.0)
            .ok_or_else(|| UnitError::MissingContext {
                bridge: self,
                detail: "no molar mass for the reported basis".to_string(),
            })
    }

    fn positive(self, value: f64) -> Result<f64, UnitError> {
        if value > 0.0 {
            Ok(value)
        } else {
            Err(UnitError::MissingContext {
                bridge: self,
                detail: format!("power law is undefined for {value}"),
            })
        }
    }
}

/// Oxygen concentration at 100% saturation in mg/l (Benson-Krause with the
/// USGS pressure correction). About 8.26 mg/l at 25 degC and 1 atm.
pub fn oxygen_saturation_mg_l(temperature_c: f64, pressure_atm: f64) -> f64 {
    let t = temperature_c;
    let p = pressure_atm;
    let kelvin = t + 273.15;
    let c0 = (7.7117 - 1.31403 * (t + 45.93).ln()).exp();
    let pwv = (11.8571 - 3840.7 / kelvin - 216961.0 / kelvin.powi(2)).exp();
    let theta = 0.000975 - 0.00001426 * t + 0.00000006436 * t.powi(2);
    c0 * p * ((1.0 - pwv / p) * (1.0 - theta * p)) / ((1.0 - pwv) * (1.0 - theta))
}

/// Absolute salinity given as density (g/l) to PSU.
fn density_to_psu(grams_per_liter: f64) -> f64 {
    let reference = 35.16504 / 35.0;
    if grams_per_liter > 1000.0 {
        grams_per_liter * reference - 1000.0
    } else {
        (grams_per_liter + 1000.0) * reference - 1000.0
    }
}

/// PSS-78 practical salinity from conductivity in uS/cm, zero gauge pressure.
fn conductivity_to_psu(micro_siemens_cm: f64, temperature_c: f64) -> f64 {
    const A: [f64; 6] = [0.008, -0.1692, 25.3851, 14.0941, -7.0261, 2.7081];
    const B: [f64; 6] = [5e-04, -0.0056, -0.0066, -0.0375, 0.0636, -0.0144];
    const C: [f64; 5] = [0.6766097, 0.0200564, 0.0001104, -6.9698e-07, 1.0031e-09];
    const K: f64 = 0.0162;

    let t = temperature_c;
    let compensated = (micro_siemens_cm * (1.0 + 0.0191 * (t - 25.0))).round();
    let ratio = (compensated / 1000.0) / 42.914;
    let rt = C[0] + C[1] * t + C[2] * t.powi(2) + C[3] * t.powi(3) + C[4] * t.powi(4);
    let r = (ratio / rt).max(0.0);

    let series = |coeffs: &[f64; 6]| {
        coeffs
            .iter()
            .enumerate()
            .map(|(i, coeff)| coeff * r.powf(i as f64 / 2.0))
            .sum::<f64>()
    };
    let delta = series(&B) * (t - 15.0) / (1.0 + K * (t - 15.0));
    ((series(&A) + delta) * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saturation_at_reference_conditions() {
        let cp = oxygen_saturation_mg_l(25.0, 1.0);
        assert!((cp - 8.26).abs() < 0.01, "got {cp}");
    }

    #[test]
    fn seawater_conductivity_is_about_35_psu() {
        let psu = conductivity_to_psu(53_087.0, 25.0);
        assert!((psu - 35.0).abs() < 0.1, "got {psu}");
    }
}
