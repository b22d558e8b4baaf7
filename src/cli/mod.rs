//! Command-line parsing for the FRED trend reporter.
//!
//! Parsing lives here; dispatch lives in `app`. Report subcommands need no
//! flags at all, so `ftrend` alone produces the default unemployment report.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::domain::{FileFormat, Frequency, ReportKind, UnitsTransform};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "ftrend", version, about = "FRED series client and unemployment trend reports")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Search FRED series by keyword.
    Search(SearchArgs),
    /// Fetch observations for one series and optionally persist raw/cleaned copies.
    Fetch(FetchArgs),
    /// Clean a previously saved raw table.
    Clean(CleanArgs),
    /// Print a series' metadata record.
    Info(InfoArgs),
    /// Print the provider's raw JSON payload for a series.
    Json(JsonArgs),
    /// Run one of the built-in reports (statistics table, chart, persisted data).
    Report(ReportArgs),
}

#[derive(Debug, Args, Clone)]
pub struct SearchArgs {
    /// Search text.
    pub keyword: String,

    /// Keep only results whose notes mention this text (case-insensitive).
    #[arg(long)]
    pub category: Option<String>,

    /// Maximum number of results requested.
    #[arg(long, default_value_t = 10)]
    pub limit: usize,
}

#[derive(Debug, Args, Clone)]
pub struct FetchArgs {
    /// FRED series id, e.g. UNRATE.
    pub series_id: String,

    /// First observation date (YYYY-MM-DD).
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Last observation date (YYYY-MM-DD).
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Resample to this frequency.
    #[arg(long, value_enum)]
    pub frequency: Option<Frequency>,

    /// Units transformation applied by the provider.
    #[arg(long, value_enum)]
    pub units: Option<UnitsTransform>,

    /// Also write a cleaned copy using this method (drop, forward_fill, interpolate, zero).
    #[arg(long, value_name = "METHOD")]
    pub clean: Option<String>,

    #[arg(long, value_enum, default_value_t = FileFormat::Csv)]
    pub format: FileFormat,

    /// Print only; write nothing to disk.
    #[arg(long)]
    pub no_save: bool,

    /// Rows printed from the head of the table.
    #[arg(long, default_value_t = 5)]
    pub head: usize,
}

#[derive(Debug, Args, Clone)]
pub struct CleanArgs {
    /// Key of the saved table (file name without the `_raw.<ext>` suffix).
    pub key: String,

    /// Cleaning method: drop, forward_fill, interpolate, zero.
    #[arg(long, default_value = "drop")]
    pub method: String,

    #[arg(long, value_enum, default_value_t = FileFormat::Csv)]
    pub format: FileFormat,
}

#[derive(Debug, Args, Clone)]
pub struct InfoArgs {
    pub series_id: String,
}

#[derive(Debug, Args, Clone)]
pub struct JsonArgs {
    pub series_id: String,

    #[arg(long)]
    pub start: Option<NaiveDate>,

    #[arg(long)]
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Args, Clone)]
pub struct ReportArgs {
    /// Which report to run.
    #[arg(value_enum, default_value_t = ReportKind::Unemployment)]
    pub kind: ReportKind,

    /// Trailing window in years.
    #[arg(long, default_value_t = 10)]
    pub years: u32,

    /// Series catalog JSON overriding the built-in list.
    #[arg(long, value_name = "JSON")]
    pub catalog: Option<PathBuf>,

    /// Format of the persisted raw/cleaned tables.
    #[arg(long, value_enum, default_value_t = FileFormat::Csv)]
    pub format: FileFormat,

    /// Output directory for the statistics CSV and chart.
    #[arg(long)]
    pub report_dir: Option<PathBuf>,
}
