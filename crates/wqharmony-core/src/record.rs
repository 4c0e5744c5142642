use std::collections::HashMap;

use polars::prelude::*;

use crate::columns;
use crate::error::RowIdentity;

/// One raw result row, borrowed from a [`ResultTable`]. Blank cells read as
/// `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResultRecord<'a> {
    pub row: usize,
    pub organization: Option<&'a str>,
    pub activity: Option<&'a str>,
    pub location: Option<&'a str>,
    pub activity_type: Option<&'a str>,
    pub characteristic: &'a str,
    pub value: Option<&'a str>,
    pub unit: Option<&'a str>,
    pub fraction: Option<&'a str>,
    pub speciation: Option<&'a str>,
}

impl ResultRecord<'_> {
    pub fn identity(&self) -> RowIdentity {
        RowIdentity {
            row: self.row,
            organization: self.organization.map(str::to_string),
            activity: self.activity.map(str::to_string),
            location: self.location.map(str::to_string),
        }
    }
}

/// String view over the columns the normalizer reads. Columns of any dtype
/// are accepted and read through a cast to `String`.
#[derive(Debug, Clone)]
pub struct ResultTable {
    height: usize,
    columns: HashMap<&'static str, Vec<Option<String>>>,
}

const RECORD_COLUMNS: &[&str] = &[
    columns::ORGANIZATION_ID,
    columns::ACTIVITY_ID,
    columns::LOCATION_ID,
    columns::ACTIVITY_TYPE,
    columns::CHARACTERISTIC,
    columns::RESULT_VALUE,
    columns::RESULT_UNIT,
    columns::SAMPLE_FRACTION,
    columns::METHOD_SPECIATION,
];

impl ResultTable {
    pub fn from_dataframe(df: &DataFrame) -> PolarsResult<Self> {
        let mut table = HashMap::new();
        for &name in RECORD_COLUMNS {
            if let Some(values) = read_strings(df, name)? {
                table.insert(name, values);
            }
        }
        Ok(Self {
            height: df.height(),
            columns: table,
        })
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    fn cell(&self, name: &str, idx: usize) -> Option<&str> {
        self.columns
            .get(name)
            .and_then(|values| values.get(idx))
            .and_then(|value| value.as_deref())
    }

    pub fn record(&self, idx: usize) -> ResultRecord<'_> {
        ResultRecord {
            row: idx,
            organization: self.cell(columns::ORGANIZATION_ID, idx),
            activity: self.cell(columns::ACTIVITY_ID, idx),
            location: self.cell(columns::LOCATION_ID, idx),
            activity_type: self.cell(columns::ACTIVITY_TYPE, idx),
            characteristic: self.cell(columns::CHARACTERISTIC, idx).unwrap_or(""),
            value: self.cell(columns::RESULT_VALUE, idx),
            unit: self.cell(columns::RESULT_UNIT, idx),
            fraction: self.cell(columns::SAMPLE_FRACTION, idx),
            speciation: self.cell(columns::METHOD_SPECIATION, idx),
        }
    }

    pub fn records(&self) -> impl Iterator<Item = ResultRecord<'_>> {
        (0..self.height).map(|idx| self.record(idx))
    }
}

/// Reads `name` as trimmed strings with blanks mapped to `None`. Returns
/// `None` when the column is absent.
pub fn read_strings(df: &DataFrame, name: &str) -> PolarsResult<Option<Vec<Option<String>>>> {
    let Some(column) = df.column(name).ok() else {
        return Ok(None);
    };
    let casted = column.cast(&DataType::String)?;
    let values = casted
        .str()?
        .into_iter()
        .map(|value| {
            value
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        })
        .collect();
    Ok(Some(values))
}
