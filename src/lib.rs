//! `fred-trends` library crate.
//!
//! The binary (`ftrend`) is a thin wrapper around this library so that:
//!
//! - the FRED client, cleaning and report pipeline are testable without spawning processes
//! - the report pipeline can run against any `SeriesSource`

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod plot;
pub mod report;
