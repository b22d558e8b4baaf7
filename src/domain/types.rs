//! Shared domain types.
//!
//! These types are intentionally small and serializable so they can be:
//!
//! - passed between the client, cleaning, and report stages
//! - written to CSV/JSON
//! - driven directly from CLI flags (`clap::ValueEnum`)

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Opaque identifier of one published series (e.g. `UNRATE`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeriesId(String);

impl SeriesId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SeriesId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Sampling interval requested from the provider (FRED `frequency` codes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    #[value(name = "d", alias = "daily")]
    Daily,
    #[value(name = "w", alias = "weekly")]
    Weekly,
    #[value(name = "bw", alias = "biweekly")]
    Biweekly,
    #[value(name = "m", alias = "monthly")]
    Monthly,
    #[value(name = "q", alias = "quarterly")]
    Quarterly,
    #[value(name = "sa", alias = "semiannual")]
    Semiannual,
    #[value(name = "a", alias = "annual")]
    Annual,
}

impl Frequency {
    pub fn as_param(self) -> &'static str {
        match self {
            Frequency::Daily => "d",
            Frequency::Weekly => "w",
            Frequency::Biweekly => "bw",
            Frequency::Monthly => "m",
            Frequency::Quarterly => "q",
            Frequency::Semiannual => "sa",
            Frequency::Annual => "a",
        }
    }
}

/// Provider-side transformation applied to values before they are returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum UnitsTransform {
    /// Levels (no transformation).
    Lin,
    /// Change.
    Chg,
    /// Change from a year ago.
    Ch1,
    /// Percent change.
    Pch,
    /// Percent change from a year ago.
    Pc1,
    /// Compounded annual rate of change.
    Pca,
    /// Continuously compounded rate of change.
    Cch,
    /// Continuously compounded annual rate of change.
    Cca,
    /// Natural log.
    Log,
}

impl UnitsTransform {
    pub fn as_param(self) -> &'static str {
        match self {
            UnitsTransform::Lin => "lin",
            UnitsTransform::Chg => "chg",
            UnitsTransform::Ch1 => "ch1",
            UnitsTransform::Pch => "pch",
            UnitsTransform::Pc1 => "pc1",
            UnitsTransform::Pca => "pca",
            UnitsTransform::Cch => "cch",
            UnitsTransform::Cca => "cca",
            UnitsTransform::Log => "log",
        }
    }
}

/// Missing-value policy applied by `data::clean`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum CleaningPolicy {
    /// Remove rows containing any missing value.
    Drop,
    /// Carry the last valid value forward.
    #[value(name = "forward_fill", alias = "ffill")]
    ForwardFill,
    /// Linear interpolation by position.
    Interpolate,
    /// Replace missing values with `0.0`.
    Zero,
}

impl CleaningPolicy {
    pub const ALL: [CleaningPolicy; 4] = [
        CleaningPolicy::Drop,
        CleaningPolicy::ForwardFill,
        CleaningPolicy::Interpolate,
        CleaningPolicy::Zero,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CleaningPolicy::Drop => "drop",
            CleaningPolicy::ForwardFill => "forward_fill",
            CleaningPolicy::Interpolate => "interpolate",
            CleaningPolicy::Zero => "zero",
        }
    }
}

impl FromStr for CleaningPolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CleaningPolicy::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| {
                AppError::invalid(format!(
                    "Invalid cleaning method '{s}'. Method must be 'drop', 'forward_fill', 'interpolate', or 'zero'."
                ))
            })
    }
}

/// Which side of the raw/clean directory split a table is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Raw,
    Clean,
}

impl Destination {
    pub fn suffix(self) -> &'static str {
        match self {
            Destination::Raw => "raw",
            Destination::Clean => "cleaned",
        }
    }
}

/// On-disk table format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Csv,
    Json,
}

impl FileFormat {
    pub fn extension(self) -> &'static str {
        match self {
            FileFormat::Csv => "csv",
            FileFormat::Json => "json",
        }
    }
}

/// One row of a series search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: SeriesId,
    pub title: String,
    pub units: String,
    pub frequency: String,
    pub seasonal_adjustment: String,
    pub last_updated: String,
    pub observation_start: String,
    pub observation_end: String,
    /// Free-text notes; only used for the rough category match.
    #[serde(default, skip_serializing)]
    pub notes: Option<String>,
}

/// Flat descriptive fields about a series (title, units, frequency, ...).
pub type SeriesInfo = BTreeMap<String, String>;

/// Descriptive statistics for one labelled series.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRecord {
    pub label: String,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation; `None` with fewer than two observations.
    pub std_dev: Option<f64>,
    pub min: f64,
    pub max: f64,
    pub count: usize,
    pub latest: f64,
    /// Last minus first observation over the query window.
    pub change: f64,
}

/// Which of the two built-in reports to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    /// Overall unemployment-class series (U-1 .. U-6).
    Unemployment,
    /// Demographic breakdown (race/ethnicity, gender, age).
    Demographic,
}

/// Fixed, per-report output conventions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportProfile {
    pub kind: ReportKind,
    pub banner: &'static str,
    pub report_dir: &'static str,
    pub stats_file: &'static str,
    pub chart_file: &'static str,
    /// Header of the label column in the statistics table.
    pub label_header: &'static str,
    /// Prefix stripped from catalog labels when building summary rows.
    pub label_prefix: Option<&'static str>,
    /// Tag appended to the series id when persisting raw/cleaned tables.
    pub persist_tag: &'static str,
    pub show_most_improved: bool,
    pub rule_width: usize,
}

impl ReportKind {
    pub fn profile(self) -> ReportProfile {
        match self {
            ReportKind::Unemployment => ReportProfile {
                kind: self,
                banner: "UNEMPLOYMENT RATE ANALYSIS SUMMARY",
                report_dir: "reports",
                stats_file: "unemployment_statistics.csv",
                chart_file: "unemployment_trends.png",
                label_header: "Series",
                label_prefix: None,
                persist_tag: "10y",
                show_most_improved: false,
                rule_width: 80,
            },
            ReportKind::Demographic => ReportProfile {
                kind: self,
                banner: "INCOME-BASED UNEMPLOYMENT RATE ANALYSIS SUMMARY",
                report_dir: "reports/income_analysis",
                stats_file: "income_unemployment_statistics.csv",
                chart_file: "income_unemployment_trends.png",
                label_header: "Group",
                label_prefix: Some("Unemployment Rate - "),
                persist_tag: "income_10y",
                show_most_improved: true,
                rule_width: 100,
            },
        }
    }
}

/// Where raw and cleaned tables are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataDirs {
    pub raw: PathBuf,
    pub clean: PathBuf,
}

impl Default for DataDirs {
    fn default() -> Self {
        Self {
            raw: PathBuf::from("raw_data"),
            clean: PathBuf::from("clean_data"),
        }
    }
}

impl DataDirs {
    pub fn dir_for(&self, destination: Destination) -> &PathBuf {
        match destination {
            Destination::Raw => &self.raw,
            Destination::Clean => &self.clean,
        }
    }
}

/// Fully-resolved report configuration.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub kind: ReportKind,
    /// Trailing window length in years (`365 * years` days).
    pub years_back: u32,
    /// Last day of the window (today for CLI runs).
    pub end_date: NaiveDate,
    pub report_dir: PathBuf,
    pub data_dirs: DataDirs,
    pub format: FileFormat,
    /// Policy used for the cleaned copy of each fetched series.
    pub clean_policy: CleaningPolicy,
    /// Window of the centered rolling mean drawn over each line.
    pub trend_window: usize,
    /// Optional catalog file overriding the built-in one.
    pub catalog_path: Option<PathBuf>,
}

impl ReportConfig {
    pub fn new(kind: ReportKind, end_date: NaiveDate) -> Self {
        Self {
            kind,
            years_back: 10,
            end_date,
            report_dir: PathBuf::from(kind.profile().report_dir),
            data_dirs: DataDirs::default(),
            format: FileFormat::Csv,
            clean_policy: CleaningPolicy::Drop,
            trend_window: 12,
            catalog_path: None,
        }
    }

    /// First day of the window; fails when the window is empty or reaches
    /// past chrono's date range.
    pub fn start_date(&self) -> Result<NaiveDate, AppError> {
        if self.years_back == 0 {
            return Err(AppError::invalid("Report window must be at least one year."));
        }
        chrono::Duration::try_days(365 * i64::from(self.years_back))
            .and_then(|span| self.end_date.checked_sub_signed(span))
            .ok_or_else(|| {
                AppError::invalid(format!(
                    "Report window of {} years starts before the earliest supported date.",
                    self.years_back
                ))
            })
    }

    /// Key used for persisted tables, e.g. `UNRATE_10y`.
    pub fn persist_key(&self, id: &SeriesId) -> String {
        let profile = self.kind.profile();
        // Tags read "10y"/"income_10y"; keep the year count in sync with the window.
        let tag = profile
            .persist_tag
            .replace("10y", &format!("{}y", self.years_back));
        format!("{id}_{tag}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn cleaning_policy_parses_known_names() {
        for policy in CleaningPolicy::ALL {
            assert_eq!(policy.name().parse::<CleaningPolicy>().unwrap(), policy);
        }
    }

    #[test]
    fn cleaning_policy_rejects_unknown_name() {
        let err = "invalid".parse::<CleaningPolicy>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn report_window_is_365_days_per_year() {
        let end = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
        let mut config = ReportConfig::new(ReportKind::Unemployment, end);
        config.years_back = 2;
        assert_eq!(config.start_date().unwrap(), NaiveDate::from_ymd_opt(2023, 7, 1).unwrap());
    }

    #[test]
    fn oversized_or_empty_report_window_is_invalid() {
        let end = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
        let mut config = ReportConfig::new(ReportKind::Unemployment, end);

        config.years_back = 300_000;
        let err = config.start_date().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);

        config.years_back = u32::MAX;
        assert_eq!(config.start_date().unwrap_err().kind(), ErrorKind::InvalidParameter);

        config.years_back = 0;
        assert_eq!(config.start_date().unwrap_err().kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn persist_key_follows_profile_tag() {
        let end = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let general = ReportConfig::new(ReportKind::Unemployment, end);
        let mut demo = ReportConfig::new(ReportKind::Demographic, end);
        assert_eq!(general.persist_key(&"UNRATE".into()), "UNRATE_10y");
        assert_eq!(demo.persist_key(&"LNS14000003".into()), "LNS14000003_income_10y");
        demo.years_back = 5;
        assert_eq!(demo.persist_key(&"LNS14000003".into()), "LNS14000003_income_5y");
    }
}
