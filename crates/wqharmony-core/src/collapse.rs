use std::collections::HashMap;

use polars::prelude::*;
use tracing::{info, warn};

use crate::columns;
use crate::config::DuplicatePolicy;
use crate::error::{HarmonizeError, Result};
use crate::qa::{self, QaCode, QaFlag};
use crate::record::read_strings;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollapseOptions {
    pub policy: DuplicatePolicy,
}

/// A value that lost a tie-break during collapse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateConflict {
    pub column: String,
    pub key: String,
    pub kept: String,
    pub discarded: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CollapseOutput {
    pub frame: DataFrame,
    pub conflicts: Vec<DuplicateConflict>,
}

const KEY_COLUMNS: [&str; 3] = [columns::LOCATION_ID, columns::ORGANIZATION_ID, columns::ACTIVITY_ID];

type Cells = Vec<Option<String>>;

fn required(df: &DataFrame, name: &str) -> Result<Cells> {
    read_strings(df, name)?.ok_or_else(|| HarmonizeError::MissingColumn(name.to_string()))
}

/// Rejects an activity id that is reported under more than one organization
/// or monitoring location.
fn check_identity(activities: &Cells, field: &str, claimed_by: &Cells) -> Result<()> {
    let mut owners: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    for (activity, owner) in activities.iter().zip(claimed_by) {
        let (Some(activity), Some(owner)) = (activity.as_deref(), owner.as_deref()) else {
            continue;
        };
        let seen = owners.entry(activity).or_insert_with(|| {
            order.push(activity);
            Vec::new()
        });
        if !seen.contains(&owner) {
            seen.push(owner);
        }
    }
    for activity in order {
        let claimed = &owners[activity];
        if claimed.len() > 1 {
            return Err(HarmonizeError::IdentityConflict {
                activity: activity.to_string(),
                field: field.to_string(),
                values: claimed.iter().map(|value| value.to_string()).collect(),
            });
        }
    }
    Ok(())
}

/// Event time used for grouping: the UTC instant, or the reported local date
/// when the instant is unknown.
fn event_times(df: &DataFrame) -> Result<Cells> {
    let height = df.height();
    let instants = read_strings(df, columns::ACTIVITY_DATETIME)?;
    let dates = match read_strings(df, columns::START_DATE_DISPLAY)? {
        Some(dates) => Some(dates),
        None => read_strings(df, columns::START_DATE)?,
    };
    Ok((0..height)
        .map(|idx| {
            instants
                .as_ref()
                .and_then(|values| values[idx].clone())
                .or_else(|| dates.as_ref().and_then(|values| values[idx].clone()))
        })
        .collect())
}

fn is_quality_control(activity_type: Option<&str>) -> bool {
    activity_type.is_some_and(|value| value.trim_start().starts_with("Quality Control"))
}

fn is_qa_column(name: &str) -> bool {
    name == columns::QA_FLAG || name.starts_with("QA_")
}

/// Merges rows that describe the same sampling event into one row per
/// (location, organization, activity, time) key. Agreeing values are kept;
/// disagreeing values are resolved by `options.policy` among the non-QC rows
/// (or among all rows when every value comes from QC), and the losing values
/// are recorded as `duplicate_conflict` flags. QA columns are merged by
/// ordered union.
pub fn collapse_results(df: &DataFrame, options: &CollapseOptions) -> Result<CollapseOutput> {
    let mut key_cells: Vec<Cells> = Vec::with_capacity(4);
    for name in KEY_COLUMNS {
        key_cells.push(required(df, name)?);
    }
    check_identity(&key_cells[2], columns::ORGANIZATION_ID, &key_cells[1])?;
    check_identity(&key_cells[2], columns::LOCATION_ID, &key_cells[0])?;
    key_cells.push(event_times(df)?);

    let height = df.height();
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut group_keys: Vec<String> = Vec::new();
    let mut index: HashMap<Vec<Option<&str>>, usize> = HashMap::new();
    for idx in 0..height {
        let key: Vec<Option<&str>> = key_cells.iter().map(|cells| cells[idx].as_deref()).collect();
        let group = *index.entry(key.clone()).or_insert_with(|| {
            groups.push(Vec::new());
            group_keys.push(
                key.iter()
                    .map(|part| part.unwrap_or("-"))
                    .collect::<Vec<_>>()
                    .join("/"),
            );
            groups.len() - 1
        });
        groups[group].push(idx);
    }

    let quality_control: Vec<bool> = match read_strings(df, columns::ACTIVITY_TYPE)? {
        Some(types) => types.iter().map(|value| is_quality_control(value.as_deref())).collect(),
        None => vec![false; height],
    };

    let names: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect();

    let mut conflicts: Vec<DuplicateConflict> = Vec::new();
    // (QA column, group) -> flags raised while merging value columns
    let mut pending: HashMap<(String, usize), Vec<String>> = HashMap::new();
    let mut merged: Vec<Option<Column>> = vec![None; names.len()];

    for (position, name) in names.iter().enumerate() {
        if is_qa_column(name) {
            continue;
        }
        let cells = required(df, name)?;
        let companion = columns::qa_column(name);
        let flag_column = if names.contains(&companion) {
            companion
        } else {
            columns::QA_COLLAPSE.to_string()
        };

        let mut chosen: Vec<IdxSize> = Vec::with_capacity(groups.len());
        for (group_idx, rows) in groups.iter().enumerate() {
            let present: Vec<usize> = rows.iter().copied().filter(|&row| cells[row].is_some()).collect();
            let mut distinct: Vec<&str> = Vec::new();
            for &row in &present {
                let value = cells[row].as_deref().unwrap_or_default();
                if !distinct.contains(&value) {
                    distinct.push(value);
                }
            }

            let pick = if distinct.len() <= 1 {
                present.first().copied().unwrap_or(rows[0])
            } else {
                let primary: Vec<usize> = present
                    .iter()
                    .copied()
                    .filter(|&row| !quality_control[row])
                    .collect();
                // QC rows only decide when no primary row has a value.
                let candidates = if primary.is_empty() { &present } else { &primary };
                let pick = match options.policy {
                    DuplicatePolicy::KeepFirst => candidates[0],
                    DuplicatePolicy::KeepLast => candidates[candidates.len() - 1],
                };

                let kept = cells[pick].clone().unwrap_or_default();
                let discarded: Vec<String> = distinct
                    .iter()
                    .filter(|value| **value != kept)
                    .map(|value| value.to_string())
                    .collect();
                let flag = QaFlag::new(
                    QaCode::DuplicateConflict,
                    format!("{name} kept {kept}, discarded {}", discarded.join(", ")),
                );
                pending
                    .entry((flag_column.clone(), group_idx))
                    .or_default()
                    .push(flag.to_string());
                conflicts.push(DuplicateConflict {
                    column: name.clone(),
                    key: group_keys[group_idx].clone(),
                    kept,
                    discarded,
                });
                pick
            };
            chosen.push(pick as IdxSize);
        }

        let take = IdxCa::from_vec("take".into(), chosen);
        let series = df.column(name)?.as_materialized_series().take(&take)?;
        merged[position] = Some(series.into());
    }

    let needs_collapse_column = !names.iter().any(|name| name == columns::QA_COLLAPSE)
        && pending.keys().any(|(column, _)| column == columns::QA_COLLAPSE);
    let mut qa_names: Vec<(usize, String)> = names
        .iter()
        .enumerate()
        .filter(|(_, name)| is_qa_column(name))
        .map(|(position, name)| (position, name.clone()))
        .collect();
    if needs_collapse_column {
        merged.push(None);
        qa_names.push((merged.len() - 1, columns::QA_COLLAPSE.to_string()));
    }

    for (position, name) in qa_names {
        let cells = read_strings(df, &name)?.unwrap_or_else(|| vec![None; height]);
        let values: Vec<Option<String>> = groups
            .iter()
            .enumerate()
            .map(|(group_idx, rows)| {
                let extra = pending
                    .get(&(name.clone(), group_idx))
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                qa::union_rendered(
                    rows.iter()
                        .filter_map(|&row| cells[row].as_deref())
                        .chain(extra.iter().map(String::as_str)),
                )
            })
            .collect();
        merged[position] = Some(Series::new(name.as_str().into(), values).into());
    }

    let frame = DataFrame::new(merged.into_iter().flatten().collect())?;

    if !conflicts.is_empty() {
        warn!(conflicts = conflicts.len(), "conflicting duplicate values resolved during collapse");
    }
    info!(rows_in = height, rows_out = frame.height(), "collapse complete");

    Ok(CollapseOutput { frame, conflicts })
}
