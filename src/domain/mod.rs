//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - request/config enums (`Frequency`, `UnitsTransform`, `CleaningPolicy`, `ReportKind`)
//! - the date-indexed `ObservationTable`
//! - series catalogs and summary records

pub mod catalog;
pub mod table;
pub mod types;

pub use catalog::*;
pub use table::*;
pub use types::*;
