//! Shared report pipeline used by both report variants.
//!
//! catalog fetch -> label -> summarize -> chart -> persist
//!
//! The pipeline only talks to a `SeriesSource`, so the CLI runs it against the
//! live FRED client and tests run it against an in-memory stub. Per-series
//! failures are logged and skipped; once the window is valid the run completes.

use std::path::PathBuf;

use chrono::NaiveDate;
use tracing::{error, info, warn};

use crate::data::{FetchRequest, SeriesSource, apply_policy};
use crate::domain::{
    Catalog, Destination, ObservationTable, ReportConfig, ReportProfile, SeriesId, SummaryRecord,
};
use crate::error::AppError;
use crate::io::{persist, write_statistics_csv};
use crate::plot::{ChartSpec, Panel, SeriesLine, render_chart};
use crate::report::{Insights, compute_insights, summarize};

/// One successfully fetched catalog series, column already renamed to its label.
#[derive(Debug, Clone)]
pub struct FetchedSeries {
    pub id: SeriesId,
    pub label: String,
    pub table: ObservationTable,
}

#[derive(Debug, Clone)]
pub struct SkippedSeries {
    pub id: SeriesId,
    pub error: AppError,
}

/// Result of fetching a whole catalog, in catalog order.
#[derive(Debug, Clone, Default)]
pub struct CatalogFetch {
    pub series: Vec<FetchedSeries>,
    pub skipped: Vec<SkippedSeries>,
}

impl CatalogFetch {
    pub fn get(&self, id: &SeriesId) -> Option<&FetchedSeries> {
        self.series.iter().find(|s| &s.id == id)
    }
}

/// All outputs of a single report run.
#[derive(Debug, Clone)]
pub struct ReportOutput {
    pub records: Vec<SummaryRecord>,
    pub insights: Insights,
    pub stats_path: Option<PathBuf>,
    pub chart_path: Option<PathBuf>,
    pub persisted: Vec<PathBuf>,
    pub skipped: Vec<SkippedSeries>,
    pub series_analyzed: usize,
}

/// Fetch every catalog series over `[start, end]`, one at a time.
pub fn fetch_catalog<S: SeriesSource + ?Sized>(
    source: &S,
    catalog: &Catalog,
    start: NaiveDate,
    end: NaiveDate,
) -> CatalogFetch {
    let mut out = CatalogFetch::default();

    for entry in &catalog.entries {
        info!(series = %entry.id, "retrieving {}", entry.label);
        let request = FetchRequest::new(entry.id.clone()).window(Some(start), Some(end));

        let fetched = source.fetch(&request).and_then(|mut table| {
            table.rename_sole_column(entry.label.as_str())?;
            Ok(table)
        });

        match fetched {
            Ok(table) => {
                info!(series = %entry.id, observations = table.len(), "retrieved {}", entry.label);
                out.series.push(FetchedSeries {
                    id: entry.id.clone(),
                    label: entry.label.clone(),
                    table,
                });
            }
            Err(e) => {
                warn!(series = %entry.id, "failed to retrieve data: {e}");
                out.skipped.push(SkippedSeries {
                    id: entry.id.clone(),
                    error: e,
                });
            }
        }
    }

    out
}

/// Label shown in tables and panel legends.
pub fn display_label<'a>(label: &'a str, profile: &ReportProfile) -> &'a str {
    profile
        .label_prefix
        .and_then(|prefix| label.strip_prefix(prefix))
        .unwrap_or(label)
}

/// One summary row per fetched series with at least one valid observation.
pub fn summarize_catalog(fetch: &CatalogFetch, profile: &ReportProfile) -> Vec<SummaryRecord> {
    fetch
        .series
        .iter()
        .filter_map(|s| {
            let record = summarize(display_label(&s.label, profile), &s.table);
            if record.is_none() {
                warn!(series = %s.id, "no valid observations; excluded from statistics");
            }
            record
        })
        .collect()
}

/// Chart layout: one combined plot, or one panel per catalog panel spec.
pub fn build_chart(fetch: &CatalogFetch, catalog: &Catalog, config: &ReportConfig) -> ChartSpec {
    let profile = config.kind.profile();
    let to_line = |s: &FetchedSeries, short: bool| SeriesLine {
        label: if short {
            display_label(&s.label, &profile).to_string()
        } else {
            s.label.clone()
        },
        points: s
            .table
            .columns()
            .first()
            .map(|col| {
                s.table
                    .dates()
                    .iter()
                    .copied()
                    .zip(col.values.iter().copied())
                    .collect()
            })
            .unwrap_or_default(),
    };

    let panels = if catalog.panels.is_empty() {
        vec![Panel {
            title: catalog.title.clone(),
            lines: fetch.series.iter().map(|s| to_line(s, false)).collect(),
        }]
    } else {
        catalog
            .panels
            .iter()
            .map(|panel| Panel {
                title: panel.title.clone(),
                lines: catalog
                    .panel_members(panel)
                    .into_iter()
                    .filter_map(|id| fetch.get(id))
                    .map(|s| to_line(s, true))
                    .collect(),
            })
            .collect()
    };

    ChartSpec {
        title: format!("{}: {}-Year Trends", catalog.title, config.years_back),
        y_label: catalog.y_label.clone(),
        panels,
        trend_window: config.trend_window,
    }
}

/// Write each fetched series raw, then cleaned with the configured policy.
pub fn persist_series(fetch: &CatalogFetch, config: &ReportConfig) -> Vec<PathBuf> {
    let mut written = Vec::new();
    for s in &fetch.series {
        let key = config.persist_key(&s.id);
        if let Ok(path) = persist(&s.table, &key, Destination::Raw, config.format, &config.data_dirs) {
            written.push(path);
        }
        let cleaned = apply_policy(&s.table, config.clean_policy);
        if let Ok(path) = persist(&cleaned, &key, Destination::Clean, config.format, &config.data_dirs) {
            written.push(path);
        }
    }
    written
}

/// Run a full report against `source`.
///
/// Only an unusable window fails the run; per-series, chart and file errors
/// are logged and reflected in the output.
pub fn run_report<S: SeriesSource + ?Sized>(
    source: &S,
    catalog: &Catalog,
    config: &ReportConfig,
) -> Result<ReportOutput, AppError> {
    let profile = config.kind.profile();
    let start = config.start_date()?;

    // 1) Fetch and label every catalog series.
    let fetch = fetch_catalog(source, catalog, start, config.end_date);
    if fetch.series.is_empty() {
        warn!("no series retrieved; report will be empty");
    }

    // 2) Statistics table.
    info!("generating descriptive statistics");
    let records = summarize_catalog(&fetch, &profile);
    let insights = compute_insights(&records, profile.show_most_improved);

    let stats_path = config.report_dir.join(profile.stats_file);
    let stats_path = match write_statistics_csv(&stats_path, &records, &profile, config.years_back) {
        Ok(()) => {
            info!(path = %stats_path.display(), "statistics saved");
            Some(stats_path)
        }
        Err(e) => {
            error!("failed to save statistics: {e}");
            None
        }
    };

    // 3) Chart.
    let chart_path = config.report_dir.join(profile.chart_file);
    let chart = build_chart(&fetch, catalog, config);
    let chart_path = match render_chart(&chart, &chart_path) {
        Ok(()) => {
            info!(path = %chart_path.display(), "visualization saved");
            Some(chart_path)
        }
        Err(e) => {
            error!("failed to render chart: {e}");
            None
        }
    };

    // 4) Raw + cleaned copies of every series.
    info!("saving raw and cleaned data for all series");
    let persisted = persist_series(&fetch, config);

    Ok(ReportOutput {
        series_analyzed: fetch.series.len(),
        records,
        insights,
        stats_path,
        chart_path,
        persisted,
        skipped: fetch.skipped,
    })
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashSet;

    use super::*;
    use crate::domain::{CatalogEntry, DataDirs, ReportKind};
    use crate::error::ErrorKind;

    /// In-memory source: records every request, fails for selected ids.
    struct StubSource {
        failing: HashSet<&'static str>,
        calls: RefCell<Vec<FetchRequest>>,
        /// Values per series, in order; dates are consecutive month starts.
        values: fn(&str) -> Vec<Option<f64>>,
    }

    impl StubSource {
        fn new(failing: &[&'static str], values: fn(&str) -> Vec<Option<f64>>) -> Self {
            Self {
                failing: failing.iter().copied().collect(),
                calls: RefCell::new(Vec::new()),
                values,
            }
        }
    }

    impl SeriesSource for StubSource {
        fn fetch(&self, request: &FetchRequest) -> Result<ObservationTable, AppError> {
            self.calls.borrow_mut().push(request.clone());
            let id = request.series_id.as_str();
            if self.failing.contains(id) {
                return Err(AppError::transport(format!("simulated failure for {id}")));
            }
            let start = request.start.unwrap_or(NaiveDate::from_ymd_opt(2015, 1, 1).unwrap());
            let obs = (self.values)(id)
                .into_iter()
                .enumerate()
                .map(|(i, v)| (start + chrono::Months::new(i as u32), v))
                .collect();
            Ok(ObservationTable::single(id, obs))
        }
    }

    fn ramp(id: &str) -> Vec<Option<f64>> {
        let step = id.len() as f64 / 10.0;
        (0..24).map(|i| Some(3.0 + step * i as f64)).collect()
    }

    fn catalog(ids: &[&str]) -> Catalog {
        Catalog {
            title: "Test".to_string(),
            y_label: "Rate (%)".to_string(),
            entries: ids
                .iter()
                .map(|id| CatalogEntry {
                    id: (*id).into(),
                    label: format!("Unemployment Rate - {id}"),
                    group: None,
                })
                .collect(),
            panels: Vec::new(),
        }
    }

    fn config(kind: ReportKind, root: &std::path::Path) -> ReportConfig {
        let mut config = ReportConfig::new(kind, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        config.report_dir = root.join("reports");
        config.data_dirs = DataDirs {
            raw: root.join("raw_data"),
            clean: root.join("clean_data"),
        };
        config
    }

    #[test]
    fn one_failed_fetch_leaves_two_summary_rows() {
        let tmp = tempfile::tempdir().unwrap();
        let source = StubSource::new(&["B"], ramp);
        let cfg = config(ReportKind::Unemployment, tmp.path());

        let out = run_report(&source, &catalog(&["A", "B", "C"]), &cfg).unwrap();

        assert_eq!(out.records.len(), 2);
        assert_eq!(out.series_analyzed, 2);
        assert_eq!(out.skipped.len(), 1);
        assert_eq!(out.skipped[0].id.as_str(), "B");
        assert_eq!(out.skipped[0].error.kind(), ErrorKind::Transport);
        assert_eq!(source.calls.borrow().len(), 3);

        let chart = out.chart_path.unwrap();
        assert_eq!(chart, tmp.path().join("reports/unemployment_trends.png"));
        assert!(chart.exists());

        let stats = std::fs::read_to_string(out.stats_path.unwrap()).unwrap();
        assert_eq!(stats.lines().count(), 3);
    }

    #[test]
    fn oversized_window_fails_before_any_fetch() {
        let tmp = tempfile::tempdir().unwrap();
        let source = StubSource::new(&[], ramp);
        let mut cfg = config(ReportKind::Unemployment, tmp.path());
        cfg.years_back = 300_000;

        let err = run_report(&source, &catalog(&["UNRATE"]), &cfg).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        assert!(source.calls.borrow().is_empty());
        assert!(!tmp.path().join("reports").exists());
    }

    #[test]
    fn catalog_fetch_uses_window_and_only_window_params() {
        let source = StubSource::new(&[], ramp);
        let start = NaiveDate::from_ymd_opt(2015, 1, 4).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let fetch = fetch_catalog(&source, &catalog(&["UNRATE"]), start, end);

        let calls = source.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].frequency, None);
        assert_eq!(calls[0].units, None);
        assert_eq!(
            calls[0].optional_params(),
            vec![
                ("observation_start", "2015-01-04".to_string()),
                ("observation_end", "2025-01-01".to_string()),
            ]
        );
        assert_eq!(
            fetch.series[0].table.column_names(),
            vec!["Unemployment Rate - UNRATE"]
        );
    }

    #[test]
    fn series_are_persisted_raw_and_cleaned_under_disjoint_names() {
        let tmp = tempfile::tempdir().unwrap();
        let source = StubSource::new(&[], |_| vec![Some(1.0), None, Some(3.0)]);
        let cfg = config(ReportKind::Demographic, tmp.path());

        let out = run_report(&source, &catalog(&["LNS14000003"]), &cfg).unwrap();

        let raw = tmp.path().join("raw_data/LNS14000003_income_10y_raw.csv");
        let clean = tmp.path().join("clean_data/LNS14000003_income_10y_cleaned.csv");
        assert_eq!(out.persisted, vec![raw.clone(), clean.clone()]);

        let raw_table = crate::io::read_table(&raw).unwrap();
        let clean_table = crate::io::read_table(&clean).unwrap();
        assert_eq!(raw_table.len(), 3);
        assert_eq!(clean_table.len(), 2);
        assert!(!clean_table.has_missing());
    }

    #[test]
    fn all_missing_series_is_fetched_but_not_summarized() {
        let tmp = tempfile::tempdir().unwrap();
        let source = StubSource::new(&[], |id| if id == "EMPTY" { vec![None, None] } else { ramp(id) });
        let cfg = config(ReportKind::Unemployment, tmp.path());

        let out = run_report(&source, &catalog(&["EMPTY", "U6RATE"]), &cfg).unwrap();
        assert_eq!(out.series_analyzed, 2);
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].label, "Unemployment Rate - U6RATE");
    }

    #[test]
    fn demographic_report_groups_ten_series_into_four_panels() {
        let tmp = tempfile::tempdir().unwrap();
        // Distinct slopes per id so std devs differ.
        let source = StubSource::new(&[], |id| {
            let k = id.bytes().last().map(|b| f64::from(b - b'0')).unwrap_or(1.0);
            (0..24).map(|i| Some(4.0 + k * 0.1 * i as f64)).collect()
        });
        let catalog = Catalog::builtin(ReportKind::Demographic).unwrap();
        let cfg = config(ReportKind::Demographic, tmp.path());

        let fetch = fetch_catalog(&source, &catalog, cfg.start_date().unwrap(), cfg.end_date);
        let chart = build_chart(&fetch, &catalog, &cfg);
        let sizes: Vec<usize> = chart.panels.iter().map(|p| p.lines.len()).collect();
        assert_eq!(sizes, vec![4, 4, 2, 10]);
        assert_eq!(chart.grid(), (2, 2));
        assert_eq!(chart.panels[0].lines[0].label, "White");

        let profile = cfg.kind.profile();
        let records = summarize_catalog(&fetch, &profile);
        assert_eq!(records.len(), 10);

        let insights = compute_insights(&records, true);
        let max_std = records
            .iter()
            .filter_map(|r| r.std_dev)
            .fold(f64::NEG_INFINITY, f64::max);
        let volatile = insights.most_volatile.unwrap();
        assert_eq!(volatile.std_dev, Some(max_std));
        let first_with_max = records.iter().find(|r| r.std_dev == Some(max_std)).unwrap();
        assert_eq!(volatile.label, first_with_max.label);
        assert!(insights.most_improved.is_some());
    }

    #[test]
    fn general_report_draws_one_combined_panel_with_full_labels() {
        let source = StubSource::new(&[], ramp);
        let catalog = catalog(&["UNRATE", "U1RATE"]);
        let cfg = config(ReportKind::Unemployment, std::path::Path::new("."));
        let fetch = fetch_catalog(&source, &catalog, cfg.start_date().unwrap(), cfg.end_date);

        let chart = build_chart(&fetch, &catalog, &cfg);
        assert_eq!(chart.panels.len(), 1);
        assert_eq!(chart.title, "Test: 10-Year Trends");
        assert_eq!(chart.panels[0].lines[1].label, "Unemployment Rate - U1RATE");
        assert_eq!(chart.trend_window, 12);
    }
}
