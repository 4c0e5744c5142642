use std::collections::BTreeMap;

use serde::Serialize;

use crate::qa::QaCode;

/// Counts gathered while a batch runs; serialized next to the output tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HarmonizeReport {
    pub input_rows: usize,
    pub output_rows: usize,
    pub rows_per_column: BTreeMap<String, usize>,
    pub flags: BTreeMap<QaCode, usize>,
    pub unmapped_characteristics: Vec<String>,
    pub unrecognized_units: Vec<String>,
    pub duplicate_conflicts: usize,
}

impl HarmonizeReport {
    pub fn count_flag(&mut self, code: QaCode) {
        self.add_flags(code, 1);
    }

    pub fn add_flags(&mut self, code: QaCode, count: usize) {
        if count > 0 {
            *self.flags.entry(code).or_insert(0) += count;
        }
    }

    pub fn flag_count(&self, code: QaCode) -> usize {
        self.flags.get(&code).copied().unwrap_or(0)
    }
}
