use std::collections::{HashMap, HashSet};

use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone as _};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use polars::prelude::*;
use tracing::warn;

use crate::columns;
use crate::error::{HarmonizeError, Result};
use crate::record::read_strings;

const HOUR: i32 = 3600;

/// UTC offsets (seconds) for the time zone codes the result schema uses.
static TIMEZONE_OFFSETS: Lazy<HashMap<&'static str, i32>> = Lazy::new(|| {
    HashMap::from([
        ("UTC", 0),
        ("GMT", 0),
        ("Z", 0),
        ("ADT", -3 * HOUR),
        ("AST", -4 * HOUR),
        ("EDT", -4 * HOUR),
        ("EST", -5 * HOUR),
        ("CDT", -5 * HOUR),
        ("CST", -6 * HOUR),
        ("MDT", -6 * HOUR),
        ("MST", -7 * HOUR),
        ("PDT", -7 * HOUR),
        ("PST", -8 * HOUR),
        ("AKDT", -8 * HOUR),
        ("AKST", -9 * HOUR),
        ("HDT", -9 * HOUR),
        ("HST", -10 * HOUR),
        ("SST", -11 * HOUR),
        ("CHST", 10 * HOUR),
        ("NDT", -(2 * HOUR + 30 * 60)),
        ("NST", -(3 * HOUR + 30 * 60)),
    ])
});

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%m/%d/%Y"))
        .ok()
}

fn parse_time(value: &str) -> Option<NaiveTime> {
    ["%H:%M:%S%.f", "%H:%M:%S", "%H:%M"]
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(value, format).ok())
}

/// Local wall-clock time in zone `code` to UTC microseconds.
pub fn to_utc_micros(local: NaiveDateTime, code: &str) -> Option<i64> {
    let code = code.trim();
    if let Some(&seconds) = TIMEZONE_OFFSETS.get(code.to_ascii_uppercase().as_str()) {
        let offset = FixedOffset::east_opt(seconds)?;
        return offset
            .from_local_datetime(&local)
            .single()
            .map(|instant| instant.timestamp_micros());
    }
    let zone: Tz = code.parse().ok()?;
    zone.from_local_datetime(&local)
        .earliest()
        .map(|instant| instant.timestamp_micros())
}

/// Adds `Activity_datetime` (UTC) and `StartDate` (the local date as
/// reported). Rows without a usable time or zone get a null instant.
pub fn activity_datetime(df: &DataFrame) -> Result<DataFrame> {
    let dates = read_strings(df, columns::START_DATE)?
        .ok_or_else(|| HarmonizeError::MissingColumn(columns::START_DATE.to_string()))?;
    let times = read_strings(df, columns::START_TIME)?;
    let zones = read_strings(df, columns::START_TZ)?;

    let cell = |values: &Option<Vec<Option<String>>>, idx: usize| -> Option<String> {
        values.as_ref().and_then(|values| values[idx].clone())
    };

    let mut unknown_zones: HashSet<String> = HashSet::new();
    let mut instants: Vec<Option<i64>> = Vec::with_capacity(df.height());

    for idx in 0..dates.len() {
        let date = dates[idx].as_deref().and_then(parse_date);
        let time = cell(&times, idx).and_then(|time| parse_time(&time));
        let instant = match (date, time, cell(&zones, idx)) {
            (Some(date), Some(time), Some(zone)) => {
                let converted = to_utc_micros(date.and_time(time), &zone);
                if converted.is_none() && unknown_zones.insert(zone.clone()) {
                    warn!(zone = %zone, row = idx, "unrecognized time zone code");
                }
                converted
            }
            _ => None,
        };
        instants.push(instant);
    }

    let datetime = Series::new(columns::ACTIVITY_DATETIME.into(), instants).cast(
        &DataType::Datetime(TimeUnit::Microseconds, Some(polars::prelude::TimeZone::UTC)),
    )?;
    let start_date = Series::new(columns::START_DATE_DISPLAY.into(), dates);

    let mut output = df.clone();
    output.with_column(datetime)?;
    output.with_column(start_date)?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_codes_and_iana_names() {
        let local = NaiveDate::from_ymd_opt(2020, 7, 1)
            .and_then(|date| date.and_hms_opt(8, 0, 0))
            .expect("valid datetime");
        let est = to_utc_micros(local, "EST").expect("EST");
        let edt = to_utc_micros(local, "edt").expect("EDT");
        assert_eq!(est - edt, 3600 * 1_000_000);

        let new_york = to_utc_micros(local, "America/New_York").expect("IANA");
        assert_eq!(new_york, edt);
        assert!(to_utc_micros(local, "XYZ").is_none());
    }
}
