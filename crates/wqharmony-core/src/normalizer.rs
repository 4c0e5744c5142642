use std::fmt;

use thiserror::Error;
use tracing::debug;

use crate::config::ErrorMode;
use crate::error::{HarmonizeError, Result};
use crate::qa::{QaCode, QaFlags};
use crate::record::ResultRecord;
use crate::rulebook::{CharacteristicRule, ValueKind};
use crate::units::{self, ConversionContext, UnitDef, UnitError, UnitRegistry};

#[derive(Debug, Clone, PartialEq)]
pub enum MeasureValue {
    Numeric(f64),
    Categorical(String),
}

impl MeasureValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MeasureValue::Numeric(value) => Some(*value),
            MeasureValue::Categorical(_) => None,
        }
    }
}

impl fmt::Display for MeasureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeasureValue::Numeric(value) => write!(f, "{value}"),
            MeasureValue::Categorical(value) => f.write_str(value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualifierKind {
    Fraction,
    Basis,
}

impl fmt::Display for QualifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualifierKind::Fraction => f.write_str("fraction"),
            QualifierKind::Basis => f.write_str("basis"),
        }
    }
}

/// Row-level issues. None of these stop processing; each becomes a QA flag.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValueIssue {
    #[error("missing result")]
    Missing,
    #[error("\"{0}\" result cannot be used")]
    Invalid(String),
    #[error("{kind} '{value}' not recognized")]
    UnrecognizedQualifier { kind: QualifierKind, value: String },
}

impl ValueIssue {
    pub fn code(&self) -> QaCode {
        match self {
            ValueIssue::Missing | ValueIssue::Invalid(_) => QaCode::MissingOrInvalidValue,
            ValueIssue::UnrecognizedQualifier { .. } => QaCode::UnrecognizedQualifier,
        }
    }

    /// The crate-level error this issue would be if it were surfaced.
    pub fn into_error(self, record: &ResultRecord<'_>) -> HarmonizeError {
        let characteristic = record.characteristic.to_string();
        match self {
            ValueIssue::Missing | ValueIssue::Invalid(_) => HarmonizeError::MissingOrInvalidValue {
                row: record.identity(),
                characteristic,
                value: record.value.map(str::to_string),
            },
            ValueIssue::UnrecognizedQualifier { kind, value } => {
                HarmonizeError::UnrecognizedQualifier {
                    row: record.identity(),
                    characteristic,
                    kind: kind.to_string(),
                    value,
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedResult {
    pub row: usize,
    pub characteristic: String,
    /// Output column the value belongs in.
    pub placement: String,
    pub value: Option<MeasureValue>,
    pub unit: Option<String>,
    pub fraction: Option<String>,
    pub basis: Option<String>,
    pub flags: QaFlags,
}

#[derive(Debug, Clone, Default)]
pub struct NormalizeOptions {
    pub errors: ErrorMode,
    pub context: ConversionContext,
}

/// Normalizes one result against its rule. Always yields a result for the
/// row unless `options.errors` is `Raise` and the unit cannot be bridged.
pub fn normalize_result(
    record: &ResultRecord<'_>,
    rule: &CharacteristicRule,
    registry: &UnitRegistry,
    options: &NormalizeOptions,
) -> Result<NormalizedResult> {
    let mut flags = QaFlags::new();

    let (placement, fraction) = match place_fraction(rule, record.fraction) {
        Ok(placed) => placed,
        Err(issue) => {
            record_issue(&mut flags, record, rule.column, issue);
            (rule.unspecified_fraction.unwrap_or(rule.column), None)
        }
    };

    let (unit_text, unit_basis) = match record.unit {
        Some(unit) => split_unit_basis(rule, unit),
        None => (None, None),
    };
    let (method_basis, method_rejected) = match method_basis(rule, record.speciation) {
        Ok(basis) => (basis, false),
        Err(issue) => {
            record_issue(&mut flags, record, placement, issue);
            (None, true)
        }
    };
    let basis = match (unit_basis, method_basis) {
        (Some(from_unit), Some(from_method)) if from_unit != from_method => {
            flags.flag(
                QaCode::BasisMismatch,
                format!("{placement} unit basis '{from_unit}' overrides method basis '{from_method}'"),
            );
            Some(from_unit)
        }
        (None, None) if !method_rejected => rule.default_basis,
        (from_unit, from_method) => from_unit.or(from_method),
    };

    let mut result = NormalizedResult {
        row: record.row,
        characteristic: rule.name.to_string(),
        placement: placement.to_string(),
        value: None,
        unit: rule.target_unit.clone(),
        fraction: fraction.map(str::to_string),
        basis: basis.map(str::to_string),
        flags: QaFlags::new(),
    };

    let raw_value = match parse_value(rule.kind, record.value) {
        Ok(value) => value,
        Err(issue) => {
            record_issue(&mut flags, record, placement, issue);
            result.flags = flags;
            return Ok(result);
        }
    };

    let number = match raw_value {
        MeasureValue::Numeric(number) => number,
        categorical => {
            result.value = Some(categorical);
            result.flags = flags;
            return Ok(result);
        }
    };

    let Some(target_symbol) = rule.target_unit.as_deref() else {
        result.value = Some(MeasureValue::Numeric(number));
        result.unit = unit_text.map(str::to_string);
        result.flags = flags;
        return Ok(result);
    };
    let target = registry
        .get(target_symbol)
        .ok_or_else(|| HarmonizeError::UnrecognizedUnit {
            row: record.identity(),
            characteristic: rule.name.to_string(),
            unit: target_symbol.to_string(),
        })?;

    let source = match resolve_unit(rule, registry, unit_text) {
        Ok(def) => def,
        Err(err) => match rule.default_unit.and_then(|default| registry.lookup(default).ok()) {
            Some(default) => {
                let detail = match unit_text {
                    None => format!("{placement} MISSING UNITS, {} assumed", default.symbol),
                    Some(_) => format!("{placement} {err}, {} assumed", default.symbol),
                };
                flags.flag(QaCode::AssumedUnit, detail);
                default
            }
            None => {
                let detail = match unit_text {
                    None => format!("MISSING UNITS and no default for {placement}"),
                    Some(unit) => format!("'{unit}' UNDEFINED UNIT for {placement}"),
                };
                flags.flag(QaCode::UnitUnresolved, detail);
                result.unit = unit_text.map(str::to_string);
                result.flags = flags;
                return Ok(result);
            }
        },
    };

    let molar_mass = basis
        .and_then(|label| rule.basis(label))
        .map(|basis| basis.molar_mass)
        .or(rule.default_molar_mass);
    let context = options.context.with_molar_mass(molar_mass);

    match units::convert(number, source, target, rule.bridges, &context) {
        Ok(converted) => {
            result.value = Some(MeasureValue::Numeric(converted));
        }
        Err(err) => match options.errors {
            ErrorMode::Raise => {
                return Err(HarmonizeError::ConversionDimensionality {
                    row: record.identity(),
                    characteristic: rule.name.to_string(),
                    from: source.symbol.to_string(),
                    to: target.symbol.to_string(),
                    detail: err.to_string(),
                });
            }
            ErrorMode::Warn => {
                flags.flag(QaCode::ConversionError, format!("{placement} {err}, value left unconverted"));
                result.value = Some(MeasureValue::Numeric(number));
                result.unit = Some(source.symbol.to_string());
            }
            ErrorMode::Ignore => {
                flags.flag(QaCode::ConversionError, format!("{placement} {err}, value dropped"));
            }
        },
    }

    result.flags = flags;
    Ok(result)
}

fn record_issue(flags: &mut QaFlags, record: &ResultRecord<'_>, placement: &str, issue: ValueIssue) {
    flags.flag(issue.code(), format!("{placement} {issue}"));
    debug!(error = %issue.into_error(record), "value issue recorded as QA flag");
}

fn resolve_unit<'r>(
    rule: &CharacteristicRule,
    registry: &'r UnitRegistry,
    unit: Option<&str>,
) -> std::result::Result<&'r UnitDef, UnitError> {
    match unit {
        Some(unit) => registry.resolve(unit, rule.unit_aliases),
        None => Err(UnitError::Unrecognized {
            unit: String::new(),
        }),
    }
}

/// Parses the raw value as the rule's kind. Non-finite numbers are invalid.
pub fn parse_value(kind: ValueKind, raw: Option<&str>) -> std::result::Result<MeasureValue, ValueIssue> {
    let raw = raw.map(str::trim).filter(|value| !value.is_empty());
    let Some(raw) = raw else {
        return Err(ValueIssue::Missing);
    };
    match kind {
        ValueKind::Categorical => Ok(MeasureValue::Categorical(raw.to_string())),
        ValueKind::Numeric => raw
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .map(MeasureValue::Numeric)
            .ok_or_else(|| ValueIssue::Invalid(raw.to_string())),
    }
}

/// Column for the record's sample fraction. Blank fractions go to the
/// unspecified bucket; characteristics without fraction rules ignore it.
pub fn place_fraction(
    rule: &CharacteristicRule,
    fraction: Option<&str>,
) -> std::result::Result<(&'static str, Option<&'static str>), ValueIssue> {
    if !rule.distinguishes_fractions() {
        return Ok((rule.column, None));
    }
    let fallback = rule.unspecified_fraction.unwrap_or(rule.column);
    let Some(fraction) = fraction.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok((fallback, None));
    };
    rule.fractions
        .iter()
        .find(|known| known.fraction.eq_ignore_ascii_case(fraction))
        .map(|known| (known.column, Some(known.fraction)))
        .ok_or_else(|| ValueIssue::UnrecognizedQualifier {
            kind: QualifierKind::Fraction,
            value: fraction.to_string(),
        })
}

/// Splits a trailing basis off a unit, e.g. `mg/l as P` or `mg/l P`.
pub fn split_unit_basis<'u>(
    rule: &CharacteristicRule,
    unit: &'u str,
) -> (Option<&'u str>, Option<&'static str>) {
    let unit = unit.trim();
    if rule.bases.is_empty() {
        return (Some(unit), None);
    }
    let Some((head, last)) = unit.rsplit_once(char::is_whitespace) else {
        return (Some(unit), None);
    };
    let Some(basis) = rule.basis(last) else {
        return (Some(unit), None);
    };
    let head = head.trim_end();
    let head = head
        .strip_suffix(" as")
        .or_else(|| head.strip_suffix(" AS"))
        .unwrap_or(head)
        .trim_end();
    let head = (!head.is_empty()).then_some(head);
    (head, Some(basis.label))
}

/// Basis named by the method speciation field, e.g. `as P`.
pub fn method_basis(
    rule: &CharacteristicRule,
    speciation: Option<&str>,
) -> std::result::Result<Option<&'static str>, ValueIssue> {
    if rule.bases.is_empty() {
        return Ok(None);
    }
    let Some(speciation) = speciation.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };
    let label = speciation
        .strip_prefix("as ")
        .or_else(|| speciation.strip_prefix("AS "))
        .unwrap_or(speciation)
        .trim();
    rule.basis(label)
        .map(|basis| Some(basis.label))
        .ok_or_else(|| ValueIssue::UnrecognizedQualifier {
            kind: QualifierKind::Basis,
            value: speciation.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rulebook::Rulebook;

    #[test]
    fn unit_suffix_basis_is_split() {
        let rulebook = Rulebook::standard();
        let phosphorus = rulebook.lookup("Phosphorus").expect("rule");
        assert_eq!(split_unit_basis(phosphorus, "mg/l as P"), (Some("mg/l"), Some("P")));
        assert_eq!(split_unit_basis(phosphorus, "mg/kg PO4"), (Some("mg/kg"), Some("PO4")));
        assert_eq!(split_unit_basis(phosphorus, "mg/l"), (Some("mg/l"), None));

        let turbidity = rulebook.lookup("Turbidity").expect("rule");
        assert_eq!(split_unit_basis(turbidity, "mg/l SiO2"), (Some("mg/l SiO2"), None));
    }

    #[test]
    fn nan_text_is_not_a_value() {
        assert_eq!(
            parse_value(ValueKind::Numeric, Some("NaN")),
            Err(ValueIssue::Invalid("NaN".to_string()))
        );
        assert_eq!(parse_value(ValueKind::Numeric, Some("  ")), Err(ValueIssue::Missing));
        assert_eq!(
            parse_value(ValueKind::Numeric, Some(" 7.5 ")),
            Ok(MeasureValue::Numeric(7.5))
        );
    }
}
