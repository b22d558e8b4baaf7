//! Formatted terminal output for report runs.
//!
//! Formatting lives in one place so the pipeline stays free of presentation
//! details and output changes are localized.

use std::path::Path;

use crate::domain::{ObservationTable, ReportProfile, SearchHit, SeriesInfo, SummaryRecord};
use crate::io::export::statistics_header;
use crate::report::{Insights, round2};

/// Everything the console summary needs from a finished run.
pub struct SummaryView<'a> {
    pub profile: &'a ReportProfile,
    pub years_back: u32,
    pub series_analyzed: usize,
    pub records: &'a [SummaryRecord],
    pub insights: &'a Insights,
    pub raw_dir: &'a Path,
    pub clean_dir: &'a Path,
    pub stats_path: Option<&'a Path>,
    pub chart_path: Option<&'a Path>,
}

pub fn format_report_summary(view: &SummaryView<'_>) -> String {
    let mut out = String::new();
    let rule = "=".repeat(view.profile.rule_width);

    out.push('\n');
    out.push_str(&rule);
    out.push('\n');
    out.push_str(view.profile.banner);
    out.push('\n');
    out.push_str(&rule);
    out.push('\n');
    out.push_str(&format!("Analysis Period: Last {} years\n", view.years_back));
    out.push_str(&format!("Number of Series Analyzed: {}\n", view.series_analyzed));
    out.push_str(&format!("Raw data saved to: {}/\n", view.raw_dir.display()));
    out.push_str(&format!("Cleaned data saved to: {}/\n", view.clean_dir.display()));

    out.push_str("\nDescriptive Statistics:\n");
    out.push_str(&"-".repeat(view.profile.rule_width.min(80)));
    out.push('\n');
    out.push_str(&format_statistics_table(view.records, view.profile, view.years_back));

    out.push_str(&format_insights(view.insights));

    match view.chart_path {
        Some(p) => out.push_str(&format!("\nVisualization saved to: {}\n", p.display())),
        None => out.push_str("\nVisualization: not rendered\n"),
    }
    match view.stats_path {
        Some(p) => out.push_str(&format!("Statistics saved to: {}\n", p.display())),
        None => out.push_str("Statistics: not saved\n"),
    }

    out
}

/// Fixed-width statistics table; labels are truncated to keep rows aligned.
pub fn format_statistics_table(records: &[SummaryRecord], profile: &ReportProfile, years_back: u32) -> String {
    const LABEL_W: usize = 40;
    let header = statistics_header(profile, years_back);

    let mut out = String::new();
    out.push_str(&format!("{:<LABEL_W$}", truncate(&header[0], LABEL_W)));
    for h in &header[1..] {
        out.push_str(&format!(" {h:>12}"));
    }
    out.push('\n');

    for r in records {
        out.push_str(&format!("{:<LABEL_W$}", truncate(&r.label, LABEL_W)));
        let cells = [
            fmt2(r.mean),
            fmt2(r.median),
            r.std_dev.map(fmt2).unwrap_or_else(|| "NaN".to_string()),
            fmt2(r.min),
            fmt2(r.max),
            r.count.to_string(),
            fmt2(r.latest),
            fmt2(r.change),
        ];
        for c in cells {
            out.push_str(&format!(" {c:>12}"));
        }
        out.push('\n');
    }

    out
}

pub fn format_insights(insights: &Insights) -> String {
    let mut lines = Vec::new();
    if let Some(r) = &insights.highest_mean {
        lines.push(format!("- Highest average rate: {} ({}%)", r.label, fmt2(r.mean)));
    }
    if let Some(r) = &insights.lowest_mean {
        lines.push(format!("- Lowest average rate: {} ({}%)", r.label, fmt2(r.mean)));
    }
    if let Some(r) = &insights.most_volatile {
        let std = r.std_dev.map(fmt2).unwrap_or_default();
        lines.push(format!("- Most volatile: {} (Std Dev: {std})", r.label));
    }
    if let Some(r) = &insights.most_improved {
        lines.push(format!("- Most improved over the window: {} ({}%)", r.label, fmt2(r.change)));
    }

    if lines.is_empty() {
        return String::new();
    }
    format!("\nKey Insights:\n{}\n", lines.join("\n"))
}

/// Search results as a compact table (id, frequency, units, title).
pub fn format_search_hits(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return "No series found.\n".to_string();
    }
    let mut out = format!("{:<20} {:<10} {:<28} {}\n", "ID", "Frequency", "Units", "Title");
    for h in hits {
        out.push_str(&format!(
            "{:<20} {:<10} {:<28} {}\n",
            h.id.as_str(),
            truncate(&h.frequency, 10),
            truncate(&h.units, 28),
            h.title
        ));
    }
    out.push_str(&format!("\n{} series found.\n", hits.len()));
    out
}

pub fn format_series_info(info: &SeriesInfo) -> String {
    let width = info.keys().map(String::len).max().unwrap_or(0);
    info.iter()
        .map(|(k, v)| format!("{k:<width$} : {v}\n"))
        .collect()
}

/// First `rows` rows of a table; missing cells print as `NaN`.
pub fn format_table_head(table: &ObservationTable, rows: usize) -> String {
    let mut out = String::from("date      ");
    for name in table.column_names() {
        out.push_str(&format!(" {name:>12}"));
    }
    out.push('\n');
    for (i, date) in table.dates().iter().take(rows).enumerate() {
        out.push_str(&date.format("%Y-%m-%d").to_string());
        for col in table.columns() {
            let cell = col.values[i].map(|v| v.to_string()).unwrap_or_else(|| "NaN".to_string());
            out.push_str(&format!(" {cell:>12}"));
        }
        out.push('\n');
    }
    if table.len() > rows {
        out.push_str(&format!("... ({} rows total)\n", table.len()));
    }
    out
}

fn fmt2(v: f64) -> String {
    round2(v).to_string()
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
