use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

pub const FLAG_SEPARATOR: &str = "|";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QaCode {
    MissingOrInvalidValue,
    AssumedUnit,
    UnitUnresolved,
    ConversionError,
    UnrecognizedQualifier,
    UnmappedCharacteristic,
    DuplicateConflict,
    BasisMismatch,
    Imprecise,
    MediaCorrected,
}

impl QaCode {
    pub const ALL: [QaCode; 10] = [
        QaCode::MissingOrInvalidValue,
        QaCode::AssumedUnit,
        QaCode::UnitUnresolved,
        QaCode::ConversionError,
        QaCode::UnrecognizedQualifier,
        QaCode::UnmappedCharacteristic,
        QaCode::DuplicateConflict,
        QaCode::BasisMismatch,
        QaCode::Imprecise,
        QaCode::MediaCorrected,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            QaCode::MissingOrInvalidValue => "missing_or_invalid_value",
            QaCode::AssumedUnit => "assumed_unit",
            QaCode::UnitUnresolved => "unit_unresolved",
            QaCode::ConversionError => "conversion_error",
            QaCode::UnrecognizedQualifier => "unrecognized_qualifier",
            QaCode::UnmappedCharacteristic => "unmapped_characteristic",
            QaCode::DuplicateConflict => "duplicate_conflict",
            QaCode::BasisMismatch => "basis_mismatch",
            QaCode::Imprecise => "imprecise",
            QaCode::MediaCorrected => "media_corrected",
        }
    }

    pub fn parse(code: &str) -> Option<QaCode> {
        QaCode::ALL.into_iter().find(|c| c.as_str() == code)
    }
}

impl fmt::Display for QaCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QaFlag {
    pub code: QaCode,
    pub detail: String,
}

impl QaFlag {
    pub fn new(code: QaCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into().replace(FLAG_SEPARATOR, "/"),
        }
    }
}

impl fmt::Display for QaFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.detail.is_empty() {
            write!(f, "{}", self.code)
        } else {
            write!(f, "{}: {}", self.code, self.detail)
        }
    }
}

/// Ordered QA annotations for one (row, characteristic). Entries can only be
/// appended; rendering keeps insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QaFlags(Vec<QaFlag>);

impl QaFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, flag: QaFlag) {
        self.0.push(flag);
    }

    pub fn flag(&mut self, code: QaCode, detail: impl Into<String>) {
        self.push(QaFlag::new(code, detail));
    }

    pub fn extend(&mut self, other: &QaFlags) {
        self.0.extend(other.0.iter().cloned());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QaFlag> {
        self.0.iter()
    }

    pub fn contains(&self, code: QaCode) -> bool {
        self.0.iter().any(|flag| flag.code == code)
    }

    /// `None` when there is nothing to report, matching how empty QA cells
    /// are stored.
    pub fn render(&self) -> Option<String> {
        if self.0.is_empty() {
            return None;
        }
        Some(
            self.0
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(FLAG_SEPARATOR),
        )
    }
}

/// Splits a rendered QA cell back into its entries.
pub fn split_rendered(cell: &str) -> impl Iterator<Item = &str> {
    cell.split(FLAG_SEPARATOR)
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
}

/// Code prefix of a rendered entry, if it is one of ours.
pub fn entry_code(entry: &str) -> Option<QaCode> {
    let code = entry.split(':').next().unwrap_or(entry).trim();
    QaCode::parse(code)
}

/// Merges rendered QA cells keeping first-seen order and dropping repeats.
pub fn union_rendered<'a, I>(cells: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut merged: Vec<&str> = Vec::new();
    for cell in cells {
        for entry in split_rendered(cell) {
            if !merged.contains(&entry) {
                merged.push(entry);
            }
        }
    }
    if merged.is_empty() {
        None
    } else {
        Some(merged.join(FLAG_SEPARATOR))
    }
}

/// Per-code tally over rendered QA cells.
pub fn count_codes<'a, I>(cells: I) -> BTreeMap<QaCode, usize>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts = BTreeMap::new();
    for cell in cells {
        for entry in split_rendered(cell) {
            if let Some(code) = entry_code(entry) {
                *counts.entry(code).or_insert(0) += 1;
            }
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_keeps_insertion_order() {
        let mut flags = QaFlags::new();
        flags.flag(QaCode::AssumedUnit, "Temperature: MISSING UNITS, degC assumed");
        flags.flag(QaCode::UnrecognizedQualifier, "fraction 'Bogus'");
        assert_eq!(
            flags.render().as_deref(),
            Some("assumed_unit: Temperature: MISSING UNITS, degC assumed|unrecognized_qualifier: fraction 'Bogus'")
        );
        assert_eq!(QaFlags::new().render(), None);
    }

    #[test]
    fn union_drops_repeats_only() {
        let merged = union_rendered(["a: x|b: y", "b: y|c: z", ""]);
        assert_eq!(merged.as_deref(), Some("a: x|b: y|c: z"));
    }

    #[test]
    fn counts_by_code_prefix() {
        let counts = count_codes([
            "assumed_unit: DO|conversion_error: DO",
            "assumed_unit: pH",
            "something else",
        ]);
        assert_eq!(counts.get(&QaCode::AssumedUnit), Some(&2));
        assert_eq!(counts.get(&QaCode::ConversionError), Some(&1));
        assert_eq!(counts.len(), 2);
    }
}
