//! Input/output helpers.
//!
//! - observation table persistence + reload (`table`)
//! - statistics table export (`export`)

pub mod export;
pub mod table;

pub use export::*;
pub use table::*;
