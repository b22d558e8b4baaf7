//! Export the per-series statistics table to CSV.
//!
//! Values are rounded to two decimals, so the file is easy to read in a
//! spreadsheet and matches what the console summary prints.

use std::fs::create_dir_all;
use std::path::Path;

use crate::domain::{ReportProfile, SummaryRecord};
use crate::error::AppError;
use crate::report::round2;

pub fn statistics_header(profile: &ReportProfile, years_back: u32) -> Vec<String> {
    let mut header: Vec<String> = [profile.label_header, "Mean", "Median", "Std Dev", "Min", "Max", "Observations", "Latest Value"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    header.push(format!("{years_back}Y Change"));
    header
}

/// Write the statistics table (one row per summarized series).
pub fn write_statistics_csv(
    path: &Path,
    records: &[SummaryRecord],
    profile: &ReportProfile,
    years_back: u32,
) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        create_dir_all(parent)
            .map_err(|e| AppError::io(format!("Failed to create report dir '{}': {e}", parent.display())))?;
    }

    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::io(format!("Failed to create statistics CSV '{}': {e}", path.display())))?;

    writer
        .write_record(statistics_header(profile, years_back))
        .map_err(|e| AppError::io(format!("Failed to write statistics CSV header: {e}")))?;

    for r in records {
        writer
            .write_record([
                r.label.clone(),
                round2(r.mean).to_string(),
                round2(r.median).to_string(),
                r.std_dev.map(|v| round2(v).to_string()).unwrap_or_default(),
                round2(r.min).to_string(),
                round2(r.max).to_string(),
                r.count.to_string(),
                round2(r.latest).to_string(),
                round2(r.change).to_string(),
            ])
            .map_err(|e| AppError::io(format!("Failed to write statistics CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::io(format!("Failed to flush statistics CSV: {e}")))
}
