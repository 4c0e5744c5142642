// crates/wqharmony-core/src/error.rs

use std::fmt;

use thiserror::Error;

/// Identifying fields of the input row an error was raised for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowIdentity {
    pub row: usize,
    pub organization: Option<String>,
    pub activity: Option<String>,
    pub location: Option<String>,
}

impl fmt::Display for RowIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "row {} (organization={}, activity={}, location={})",
            self.row,
            self.organization.as_deref().unwrap_or("?"),
            self.activity.as_deref().unwrap_or("?"),
            self.location.as_deref().unwrap_or("?"),
        )
    }
}

#[derive(Error, Debug)]
pub enum HarmonizeError {
    #[error("unrecognized unit '{unit}' for {characteristic} at {row}")]
    UnrecognizedUnit {
        row: RowIdentity,
        characteristic: String,
        unit: String,
    },

    #[error("unknown characteristic '{characteristic}' at {row}")]
    UnknownCharacteristic {
        row: RowIdentity,
        characteristic: String,
    },

    #[error("cannot convert {characteristic} from '{from}' to '{to}' at {row}: {detail}")]
    ConversionDimensionality {
        row: RowIdentity,
        characteristic: String,
        from: String,
        to: String,
        detail: String,
    },

    #[error("missing or invalid value {value:?} for {characteristic} at {row}")]
    MissingOrInvalidValue {
        row: RowIdentity,
        characteristic: String,
        value: Option<String>,
    },

    #[error("unrecognized {kind} qualifier '{value}' for {characteristic} at {row}")]
    UnrecognizedQualifier {
        row: RowIdentity,
        characteristic: String,
        kind: String,
        value: String,
    },

    #[error("activity '{activity}' is claimed by conflicting {field} values: {values:?}")]
    IdentityConflict {
        activity: String,
        field: String,
        values: Vec<String>,
    },

    #[error("required column '{0}' is missing")]
    MissingColumn(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),
}

pub type Result<T> = std::result::Result<T, HarmonizeError>;
