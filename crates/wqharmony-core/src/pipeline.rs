use std::collections::BTreeMap;

use polars::prelude::*;
use tracing::info;

use crate::checks::{check_precision, wet_dry_checks};
use crate::collapse::{collapse_results, CollapseOptions};
use crate::columns;
use crate::config::HarmonizeConfig;
use crate::datetime::activity_datetime;
use crate::depth::harmonize_depth;
use crate::error::{HarmonizeError, Result};
use crate::harmonize::harmonize;
use crate::qa;
use crate::record::read_strings;
use crate::report::HarmonizeReport;
use crate::rulebook::Rulebook;
use crate::split::{split_col, split_table};
use crate::units::UnitRegistry;

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// One row per sampling event.
    pub wide: DataFrame,
    /// Characteristic-specific metadata, one row per input result, keyed by
    /// the row-identity columns.
    pub characteristic_metadata: DataFrame,
    pub units: BTreeMap<String, String>,
    pub report: HarmonizeReport,
}

/// Fields stored once per row that belong to a single characteristic, with
/// the prefix their split columns get.
const PER_CHARACTERISTIC_FIELDS: [(&str, &str); 3] = [
    (columns::QA_FLAG, columns::QA_PREFIX),
    (columns::DEPTH, columns::DEPTH),
    (columns::SPECIATION, columns::SPECIATION),
];

/// Raw long table to wide analysis-ready table.
pub fn run(
    df: &DataFrame,
    rulebook: &Rulebook,
    registry: &UnitRegistry,
    config: &HarmonizeConfig,
) -> Result<PipelineOutput> {
    config.validate()?;
    let rulebook = rulebook
        .clone()
        .with_output_units(&config.output_units, registry)
        .map_err(|err| HarmonizeError::Config(err.to_string()))?;

    let harmonized = harmonize(df, &rulebook, registry, config)?;
    let mut report = harmonized.report;

    let mut long = harmonized.frame;
    if long.column(columns::START_DATE).is_ok() {
        long = activity_datetime(&long)?;
    }
    long = harmonize_depth(&long, registry, &config.depth_unit)?;
    long = wet_dry_checks(&long)?;
    for (placement, &limit) in &config.precision {
        long = check_precision(&long, placement, limit)?;
    }

    // Depth and check flags are added after harmonization; count the final state.
    if let Some(cells) = read_strings(&long, columns::QA_FLAG)? {
        report.flags = qa::count_codes(cells.iter().flatten().map(String::as_str));
    }

    for (field, prefix) in PER_CHARACTERISTIC_FIELDS {
        long = split_col(&long, field, prefix)?;
    }

    let tables = split_table(&long)?;
    let collapsed = collapse_results(
        &tables.main,
        &CollapseOptions {
            policy: config.duplicate_policy,
        },
    )?;

    report.output_rows = collapsed.frame.height();
    report.duplicate_conflicts = collapsed.conflicts.len();
    report.add_flags(qa::QaCode::DuplicateConflict, collapsed.conflicts.len());

    info!(
        input_rows = report.input_rows,
        events = report.output_rows,
        duplicate_conflicts = report.duplicate_conflicts,
        "pipeline complete"
    );

    Ok(PipelineOutput {
        wide: collapsed.frame,
        characteristic_metadata: tables.characteristic_metadata,
        units: harmonized.units,
        report,
    })
}
