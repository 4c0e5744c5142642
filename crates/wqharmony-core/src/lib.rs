pub mod checks;
pub mod collapse;
pub mod columns;
pub mod config;
pub mod datetime;
pub mod depth;
pub mod error;
pub mod harmonize;
pub mod normalizer;
pub mod pipeline;
pub mod qa;
pub mod record;
pub mod report;
pub mod rulebook;
pub mod split;
pub mod units;

pub use config::{DuplicatePolicy, ErrorMode, HarmonizeConfig};
pub use error::{HarmonizeError, Result, RowIdentity};
pub use rulebook::Rulebook;
pub use units::UnitRegistry;
