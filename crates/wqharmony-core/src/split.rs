use std::collections::HashSet;

use polars::prelude::*;

use crate::columns;
use crate::datetime::activity_datetime;
use crate::error::{HarmonizeError, Result};
use crate::record::read_strings;

/// Placement columns in order of first appearance in `Result_column`.
pub fn observed_placements(df: &DataFrame) -> Result<Vec<String>> {
    let placements = read_strings(df, columns::RESULT_COLUMN)?
        .ok_or_else(|| HarmonizeError::MissingColumn(columns::RESULT_COLUMN.to_string()))?;
    let mut seen = HashSet::new();
    Ok(placements
        .into_iter()
        .flatten()
        .filter(|placement| seen.insert(placement.clone()))
        .collect())
}

/// Fans `result_col` out into one `{prefix}_{placement}` column per observed
/// placement and drops the shared column. Each row's value lands only in the
/// column of its own placement; the other columns hold null for that row.
pub fn split_col(df: &DataFrame, result_col: &str, prefix: &str) -> Result<DataFrame> {
    let source = df
        .column(result_col)
        .map_err(|_| HarmonizeError::MissingColumn(result_col.to_string()))?
        .as_materialized_series()
        .clone();
    let row_placements = read_strings(df, columns::RESULT_COLUMN)?
        .ok_or_else(|| HarmonizeError::MissingColumn(columns::RESULT_COLUMN.to_string()))?;

    let mut targets = observed_placements(df)?;
    let unplaced_values = row_placements
        .iter()
        .enumerate()
        .any(|(idx, placement)| placement.is_none() && source.get(idx).map_or(false, |v| !v.is_null()));
    if unplaced_values {
        targets.push(columns::UNPLACED.to_string());
    }

    let height = df.height();
    let mut output = df.drop(result_col)?;
    for target in &targets {
        let mask: Vec<bool> = row_placements
            .iter()
            .map(|placement| match placement {
                Some(placement) => placement == target,
                None => target == columns::UNPLACED,
            })
            .collect();
        let mask = BooleanChunked::from_slice("mask".into(), &mask);
        let nulls = Series::full_null("nulls".into(), height, source.dtype());
        let split = source
            .zip_with(&mask, &nulls)?
            .with_name(columns::prefixed(prefix, target).into());
        output.with_column(split)?;
    }
    Ok(output)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    /// Defines the sampling event; kept in both tables.
    Identity,
    /// Characteristic value columns and their per-characteristic companions.
    Result,
    /// Describes the sampling event and is the same for all of its rows.
    EventMetadata,
    /// Describes one characteristic's result.
    CharacteristicMetadata,
}

/// Role of every column in `df`, in column order. Result columns are
/// recognized by the placements listed in `Result_column`.
pub fn classify_columns(df: &DataFrame) -> Result<Vec<(String, ColumnRole)>> {
    let placements: HashSet<String> = if df.column(columns::RESULT_COLUMN).is_ok() {
        observed_placements(df)?.into_iter().collect()
    } else {
        HashSet::new()
    };

    let is_result = |name: &str| {
        placements.contains(name)
            || name == columns::QA_FLAG
            || name == columns::QA_COLLAPSE
            || name
                .split_once('_')
                .is_some_and(|(_, rest)| placements.contains(rest) || rest == columns::UNPLACED)
    };

    Ok(df
        .get_column_names()
        .into_iter()
        .map(|name| {
            let name = name.as_str();
            let role = if columns::ROW_IDENTITY_COLUMNS.contains(&name) {
                ColumnRole::Identity
            } else if columns::CHARACTERISTIC_COLUMNS.contains(&name) {
                ColumnRole::CharacteristicMetadata
            } else if is_result(name) {
                ColumnRole::Result
            } else {
                ColumnRole::EventMetadata
            };
            (name.to_string(), role)
        })
        .collect())
}

#[derive(Debug, Clone)]
pub struct TableSplit {
    /// Identity, result and event metadata columns.
    pub main: DataFrame,
    /// Identity plus characteristic-specific metadata columns.
    pub characteristic_metadata: DataFrame,
}

/// Partitions the columns of a harmonized table. Adds `Activity_datetime`
/// first when it has not been computed yet.
pub fn split_table(df: &DataFrame) -> Result<TableSplit> {
    let df = if df.column(columns::ACTIVITY_DATETIME).is_err()
        && df.column(columns::START_DATE).is_ok()
    {
        activity_datetime(df)?
    } else {
        df.clone()
    };

    let roles = classify_columns(&df)?;
    let main_columns: Vec<String> = roles
        .iter()
        .filter(|(_, role)| *role != ColumnRole::CharacteristicMetadata)
        .map(|(name, _)| name.clone())
        .collect();
    let characteristic_columns: Vec<String> = roles
        .iter()
        .filter(|(_, role)| matches!(role, ColumnRole::Identity | ColumnRole::CharacteristicMetadata))
        .map(|(name, _)| name.clone())
        .collect();

    Ok(TableSplit {
        main: df.select(main_columns)?,
        characteristic_metadata: df.select(characteristic_columns)?,
    })
}
