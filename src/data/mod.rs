//! Data acquisition and cleaning.
//!
//! - FRED client + request shaping (`fred`)
//! - missing-value policies (`clean`)

pub mod clean;
pub mod fred;

pub use clean::{apply_policy, clean};
pub use fred::{FetchRequest, FredClient, SeriesSource};
