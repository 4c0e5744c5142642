use polars::prelude::*;

use crate::columns;
use crate::error::{HarmonizeError, Result};
use crate::qa::{self, QaCode, QaFlag};
use crate::record::read_strings;
use crate::units::{Dimension, UnitRegistry};

/// Converts the result depth fields into a `Depth` column in `unit`.
/// Depths that cannot be converted stay null and are flagged on `QA_flag`.
pub fn harmonize_depth(df: &DataFrame, registry: &UnitRegistry, unit: &str) -> Result<DataFrame> {
    let target = registry
        .lookup(unit)
        .map_err(|err| HarmonizeError::Config(format!("depth unit: {err}")))?;
    if target.dimension != Dimension::Length {
        return Err(HarmonizeError::Config(format!(
            "depth unit '{unit}' is not a length"
        )));
    }

    let height = df.height();
    let values = read_strings(df, columns::DEPTH_VALUE)?.unwrap_or_else(|| vec![None; height]);
    let units = read_strings(df, columns::DEPTH_UNIT)?.unwrap_or_else(|| vec![None; height]);
    let existing_flags = read_strings(df, columns::QA_FLAG)?.unwrap_or_else(|| vec![None; height]);

    let mut depths: Vec<Option<f64>> = Vec::with_capacity(height);
    let mut flags: Vec<Option<String>> = Vec::with_capacity(height);

    for idx in 0..height {
        let mut issue: Option<QaFlag> = None;
        let depth = match values[idx].as_deref() {
            None => None,
            Some(raw) => match raw.parse::<f64>().ok().filter(|value| value.is_finite()) {
                None => {
                    issue = Some(QaFlag::new(
                        QaCode::MissingOrInvalidValue,
                        format!("{} \"{raw}\" depth cannot be used", columns::DEPTH),
                    ));
                    None
                }
                Some(value) => match units[idx].as_deref().map(|code| registry.lookup(code)) {
                    None => {
                        issue = Some(QaFlag::new(
                            QaCode::UnitUnresolved,
                            format!("{} MISSING UNITS, depth left null", columns::DEPTH),
                        ));
                        None
                    }
                    Some(Err(err)) => {
                        issue = Some(QaFlag::new(
                            QaCode::UnitUnresolved,
                            format!("{} {err}", columns::DEPTH),
                        ));
                        None
                    }
                    Some(Ok(source)) if source.dimension != Dimension::Length => {
                        issue = Some(QaFlag::new(
                            QaCode::ConversionError,
                            format!("{} '{}' is not a length", columns::DEPTH, source.symbol),
                        ));
                        None
                    }
                    Some(Ok(source)) => Some(target.from_base(source.to_base(value))),
                },
            },
        };
        depths.push(depth);

        let issue = issue.map(|flag| flag.to_string());
        flags.push(qa::union_rendered(
            existing_flags[idx].as_deref().into_iter().chain(issue.as_deref()),
        ));
    }

    let mut output = df.clone();
    output.with_column(Series::new(columns::DEPTH.into(), depths))?;
    output.with_column(Series::new(columns::QA_FLAG.into(), flags))?;
    Ok(output)
}
