use std::collections::{BTreeMap, HashMap, HashSet};

use polars::prelude::*;
use tracing::{debug, info, warn};

use crate::columns;
use crate::config::{ErrorMode, HarmonizeConfig};
use crate::error::{HarmonizeError, Result};
use crate::normalizer::{normalize_result, MeasureValue, NormalizeOptions, NormalizedResult};
use crate::qa::{self, QaCode, QaFlags};
use crate::record::{read_strings, ResultRecord, ResultTable};
use crate::report::HarmonizeReport;
use crate::rulebook::{Rulebook, ValueKind};
use crate::units::UnitRegistry;

#[derive(Debug, Clone)]
pub struct HarmonizeOutput {
    /// Input columns plus one value column per placement, `QA_flag`,
    /// `Speciation` and `Result_column`.
    pub frame: DataFrame,
    /// One entry per input row, in input order.
    pub results: Vec<NormalizedResult>,
    /// Canonical unit of each numeric placement column.
    pub units: BTreeMap<String, String>,
    pub report: HarmonizeReport,
}

/// Normalizes every row of a long-format result table. Rows are never
/// dropped; a row whose value cannot be normalized keeps a null value and
/// its QA flags.
pub fn harmonize(
    df: &DataFrame,
    rulebook: &Rulebook,
    registry: &UnitRegistry,
    config: &HarmonizeConfig,
) -> Result<HarmonizeOutput> {
    for required in [columns::CHARACTERISTIC, columns::RESULT_VALUE] {
        if df.column(required).is_err() {
            return Err(HarmonizeError::MissingColumn(required.to_string()));
        }
    }

    let table = ResultTable::from_dataframe(df)?;
    let options = NormalizeOptions {
        errors: config.errors,
        context: config.conversion_context(),
    };

    let mut results = Vec::with_capacity(table.height());
    let mut seen_characteristics: HashSet<&str> = HashSet::new();
    let mut unmapped: Vec<String> = Vec::new();
    let mut pass_through_columns = PassThroughColumns::new(df, rulebook);

    for record in table.records() {
        let result = match rulebook.lookup(record.characteristic) {
            Ok(rule) => {
                if seen_characteristics.insert(rule.name) {
                    debug!(characteristic = rule.name, column = rule.column, "harmonizing characteristic");
                }
                normalize_result(&record, rule, registry, &options)?
            }
            Err(_) if config.errors == ErrorMode::Raise => {
                return Err(HarmonizeError::UnknownCharacteristic {
                    row: record.identity(),
                    characteristic: record.characteristic.to_string(),
                });
            }
            Err(_) => {
                if !unmapped.iter().any(|name| name == record.characteristic) {
                    warn!(
                        characteristic = record.characteristic,
                        row = record.row,
                        "characteristic has no rule, passing values through"
                    );
                    unmapped.push(record.characteristic.to_string());
                }
                let placement = pass_through_columns.placement(record.characteristic);
                pass_through(&record, placement)
            }
        };
        results.push(result);
    }

    let mut report = HarmonizeReport {
        input_rows: table.height(),
        output_rows: table.height(),
        unmapped_characteristics: unmapped,
        ..HarmonizeReport::default()
    };
    for result in &results {
        *report
            .rows_per_column
            .entry(result.placement.clone())
            .or_insert(0) += 1;
        for flag in result.flags.iter() {
            report.count_flag(flag.code);
            if flag.code == QaCode::AssumedUnit || flag.code == QaCode::UnitUnresolved {
                if let Some(unit) = table.record(result.row).unit {
                    if !report.unrecognized_units.iter().any(|seen| seen == unit) {
                        warn!(unit, characteristic = %result.characteristic, "unrecognized unit");
                        report.unrecognized_units.push(unit.to_string());
                    }
                }
            }
        }
    }

    let mut units = BTreeMap::new();
    for rule in rulebook.rules() {
        if rule.kind != ValueKind::Numeric {
            continue;
        }
        if let Some(unit) = rule.target_unit.as_deref() {
            for placement in rule.placements() {
                if report.rows_per_column.contains_key(placement) {
                    units.insert(placement.to_string(), unit.to_string());
                }
            }
        }
    }

    let frame = attach_results(df, &results)?;

    info!(
        rows = report.input_rows,
        columns = report.rows_per_column.len(),
        flagged_rows = results.iter().filter(|result| !result.flags.is_empty()).count(),
        "harmonization complete"
    );

    Ok(HarmonizeOutput {
        frame,
        results,
        units,
        report,
    })
}

fn pass_through(record: &ResultRecord<'_>, placement: String) -> NormalizedResult {
    let mut flags = QaFlags::new();
    flags.flag(
        QaCode::UnmappedCharacteristic,
        format!("'{}' has no rule, value passed through", record.characteristic),
    );
    NormalizedResult {
        row: record.row,
        characteristic: record.characteristic.to_string(),
        placement,
        value: record
            .value
            .map(|value| MeasureValue::Categorical(value.to_string())),
        unit: record.unit.map(str::to_string),
        fraction: record.fraction.map(str::to_string),
        basis: record.speciation.map(str::to_string),
        flags,
    }
}

const SPLIT_PREFIXES: [&str; 3] = [columns::QA_PREFIX, columns::DEPTH, columns::SPECIATION];

/// Placement columns for characteristics without a rule. Each distinct
/// characteristic gets a column of its own that no rule, derived column or
/// input column already uses.
#[derive(Debug, Clone)]
pub struct PassThroughColumns {
    taken: HashSet<String>,
    assigned: HashMap<String, String>,
}

impl PassThroughColumns {
    pub fn new(df: &DataFrame, rulebook: &Rulebook) -> Self {
        let mut taken: HashSet<String> = df
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect();
        taken.extend(columns::DERIVED_COLUMNS.iter().map(|name| name.to_string()));
        taken.insert(columns::UNPLACED.to_string());
        for rule in rulebook.rules() {
            taken.extend(rule.placements().into_iter().map(str::to_string));
        }
        Self {
            taken,
            assigned: HashMap::new(),
        }
    }

    pub fn placement(&mut self, characteristic: &str) -> String {
        if let Some(placement) = self.assigned.get(characteristic) {
            return placement.clone();
        }
        let base = column_name(characteristic);
        // `QA_x`, `Depth_x` and `Speciation_x` are generated by the column splitter.
        let base = if SPLIT_PREFIXES
            .iter()
            .any(|prefix| base.starts_with(&format!("{prefix}_")))
        {
            format!("Unmapped_{base}")
        } else {
            base
        };
        let mut candidate = base.clone();
        let mut attempt = 1;
        while self.taken.contains(&candidate) {
            candidate = match attempt {
                1 => format!("{base}_unmapped"),
                n => format!("{base}_unmapped{n}"),
            };
            attempt += 1;
        }
        self.taken.insert(candidate.clone());
        self.assigned
            .insert(characteristic.to_string(), candidate.clone());
        candidate
    }
}

/// Column name for a characteristic without a rule.
pub fn column_name(characteristic: &str) -> String {
    let mut name = String::with_capacity(characteristic.len());
    for ch in characteristic.chars() {
        if ch.is_ascii_alphanumeric() {
            name.push(ch);
        } else if !name.ends_with('_') {
            name.push('_');
        }
    }
    let name = name.trim_matches('_');
    if name.is_empty() {
        "Unnamed_characteristic".to_string()
    } else {
        name.to_string()
    }
}

fn attach_results(df: &DataFrame, results: &[NormalizedResult]) -> Result<DataFrame> {
    let height = df.height();

    let mut order: Vec<&str> = Vec::new();
    let mut by_placement: HashMap<&str, Vec<Option<&MeasureValue>>> = HashMap::new();
    for result in results {
        let values = by_placement
            .entry(result.placement.as_str())
            .or_insert_with(|| {
                order.push(result.placement.as_str());
                vec![None; height]
            });
        values[result.row] = result.value.as_ref();
    }

    let mut output = df.clone();
    for placement in order {
        let values = &by_placement[placement];
        let all_numeric = values
            .iter()
            .flatten()
            .all(|value| matches!(value, MeasureValue::Numeric(_)));
        let series = if all_numeric {
            Series::new(
                placement.into(),
                values
                    .iter()
                    .map(|value| value.and_then(MeasureValue::as_f64))
                    .collect::<Vec<Option<f64>>>(),
            )
        } else {
            Series::new(
                placement.into(),
                values
                    .iter()
                    .map(|value| value.map(ToString::to_string))
                    .collect::<Vec<Option<String>>>(),
            )
        };
        output.with_column(series)?;
    }

    // Flags from an earlier pass are kept ahead of the new ones.
    let previous = read_strings(df, columns::QA_FLAG)?;
    let qa_values: Vec<Option<String>> = results
        .iter()
        .map(|result| {
            let earlier = previous
                .as_ref()
                .and_then(|values| values[result.row].as_deref());
            let current = result.flags.render();
            qa::union_rendered(earlier.into_iter().chain(current.as_deref()))
        })
        .collect();

    let speciation: Vec<Option<String>> = results.iter().map(|result| result.basis.clone()).collect();
    let placement: Vec<Option<String>> = results
        .iter()
        .map(|result| Some(result.placement.clone()))
        .collect();

    output.with_column(Series::new(columns::QA_FLAG.into(), qa_values))?;
    output.with_column(Series::new(columns::SPECIATION.into(), speciation))?;
    output.with_column(Series::new(columns::RESULT_COLUMN.into(), placement))?;

    Ok(output)
}
