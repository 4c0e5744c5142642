use polars::prelude::*;
use tracing::debug;

use crate::columns;
use crate::error::{HarmonizeError, Result};
use crate::qa::{self, QaCode, QaFlag};
use crate::record::read_strings;

const WATER: &str = "Water";
const SEDIMENT: &str = "Sediment";

/// Number of digits after the decimal point in a reported value.
pub fn decimal_digits(raw: &str) -> usize {
    let raw = raw.trim();
    let mantissa = raw
        .split_once(['e', 'E'])
        .map_or(raw, |(mantissa, _)| mantissa);
    mantissa
        .split_once('.')
        .map_or(0, |(_, fraction)| fraction.len())
}

/// Flags results placed in `placement` whose reported value has fewer than
/// `limit` decimal digits. Reads the value as reported, so trailing zeros
/// count. Values are left untouched.
pub fn check_precision(df: &DataFrame, placement: &str, limit: usize) -> Result<DataFrame> {
    let placements = read_strings(df, columns::RESULT_COLUMN)?
        .ok_or_else(|| HarmonizeError::MissingColumn(columns::RESULT_COLUMN.to_string()))?;
    let values = read_strings(df, columns::RESULT_VALUE)?
        .ok_or_else(|| HarmonizeError::MissingColumn(columns::RESULT_VALUE.to_string()))?;

    let detail = format!("{placement} fewer than {limit} decimal digits");
    let mut flagged = 0usize;
    let mask: Vec<bool> = placements
        .iter()
        .zip(&values)
        .map(|(row_placement, value)| {
            let imprecise = row_placement.as_deref() == Some(placement)
                && value
                    .as_deref()
                    .is_some_and(|raw| raw.trim().parse::<f64>().is_ok() && decimal_digits(raw) < limit);
            flagged += usize::from(imprecise);
            imprecise
        })
        .collect();

    debug!(placement, limit, flagged, "precision check");
    append_flag(df, &mask, &QaFlag::new(QaCode::Imprecise, detail))
}

/// Results reported in water media that are really dry-weight bed sediment
/// get their media corrected to sediment and a `media_corrected` flag.
/// Tables without the media, fraction or weight basis columns are returned
/// unchanged.
pub fn wet_dry_checks(df: &DataFrame) -> Result<DataFrame> {
    let (Some(media), Some(fractions), Some(weights)) = (
        read_strings(df, columns::ACTIVITY_MEDIA)?,
        read_strings(df, columns::SAMPLE_FRACTION)?,
        read_strings(df, columns::WEIGHT_BASIS)?,
    ) else {
        return Ok(df.clone());
    };

    let mask: Vec<bool> = (0..df.height())
        .map(|idx| {
            media[idx].as_deref() == Some(WATER)
                && fractions[idx].as_deref() == Some("Bed Sediment")
                && weights[idx].as_deref() == Some("Dry")
        })
        .collect();
    if !mask.contains(&true) {
        return Ok(df.clone());
    }

    let corrected: Vec<Option<String>> = media
        .into_iter()
        .zip(&mask)
        .map(|(value, &wrong)| if wrong { Some(SEDIMENT.to_string()) } else { value })
        .collect();
    let mut output = append_flag(
        df,
        &mask,
        &QaFlag::new(
            QaCode::MediaCorrected,
            format!("{} {WATER} changed to {SEDIMENT}", columns::ACTIVITY_MEDIA),
        ),
    )?;
    output.with_column(Series::new(columns::ACTIVITY_MEDIA.into(), corrected))?;
    Ok(output)
}

fn append_flag(df: &DataFrame, mask: &[bool], flag: &QaFlag) -> Result<DataFrame> {
    let existing = read_strings(df, columns::QA_FLAG)?.unwrap_or_else(|| vec![None; df.height()]);
    let rendered = flag.to_string();
    let flags: Vec<Option<String>> = existing
        .iter()
        .zip(mask)
        .map(|(cell, &hit)| {
            let extra = hit.then_some(rendered.as_str());
            qa::union_rendered(cell.as_deref().into_iter().chain(extra))
        })
        .collect();

    let mut output = df.clone();
    output.with_column(Series::new(columns::QA_FLAG.into(), flags))?;
    Ok(output)
}
