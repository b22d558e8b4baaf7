//! Persist observation tables to the raw/clean directory split, and read them back.
//!
//! Layouts:
//! - CSV: header `date,<column...>`, ISO dates, empty cell = missing
//! - JSON: array of records `{"date": "YYYY-MM-DD", "<column>": number | null}`;
//!   a table with no rows is written as `{"columns": [...], "records": []}` so its
//!   column set survives the round trip

use std::collections::HashMap;
use std::fs::{File, create_dir_all};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use csv::StringRecord;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{error, info};

use crate::domain::{Column, DataDirs, Destination, FileFormat, ObservationTable};
use crate::error::AppError;

/// Path a table for `series_key` is written to.
pub fn table_path(dirs: &DataDirs, series_key: &str, destination: Destination, format: FileFormat) -> PathBuf {
    dirs.dir_for(destination).join(format!(
        "{series_key}_{}.{}",
        destination.suffix(),
        format.extension()
    ))
}

/// Write `table` to `{dir}/{series_key}_{raw|cleaned}.{csv|json}`.
///
/// The outcome is logged either way; callers decide whether a failure stops
/// the batch.
pub fn persist(
    table: &ObservationTable,
    series_key: &str,
    destination: Destination,
    format: FileFormat,
    dirs: &DataDirs,
) -> Result<PathBuf, AppError> {
    let path = table_path(dirs, series_key, destination, format);
    let result = create_dir_all(dirs.dir_for(destination))
        .map_err(|e| {
            AppError::io(format!(
                "Failed to create directory '{}': {e}",
                dirs.dir_for(destination).display()
            ))
        })
        .and_then(|()| write_table(&path, table, format));

    match result {
        Ok(()) => {
            info!(path = %path.display(), rows = table.len(), "data saved");
            Ok(path)
        }
        Err(e) => {
            error!(path = %path.display(), "error saving data: {e}");
            Err(e)
        }
    }
}

pub fn write_table(path: &Path, table: &ObservationTable, format: FileFormat) -> Result<(), AppError> {
    match format {
        FileFormat::Csv => write_csv(path, table),
        FileFormat::Json => write_json(path, table),
    }
}

fn write_csv(path: &Path, table: &ObservationTable) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::io(format!("Failed to create CSV '{}': {e}", path.display())))?;

    let mut header = vec!["date"];
    header.extend(table.column_names());
    writer
        .write_record(&header)
        .map_err(|e| AppError::io(format!("Failed to write CSV header: {e}")))?;

    for (i, date) in table.dates().iter().enumerate() {
        let mut row = vec![date.to_string()];
        row.extend(
            table
                .columns()
                .iter()
                .map(|c| c.values[i].map(|v| v.to_string()).unwrap_or_default()),
        );
        writer
            .write_record(&row)
            .map_err(|e| AppError::io(format!("Failed to write CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::io(format!("Failed to flush CSV '{}': {e}", path.display())))
}

fn write_json(path: &Path, table: &ObservationTable) -> Result<(), AppError> {
    let records: Vec<Value> = table
        .dates()
        .iter()
        .enumerate()
        .map(|(i, date)| {
            let mut record = Map::new();
            record.insert("date".to_string(), Value::String(date.to_string()));
            for col in table.columns() {
                let value = col.values[i].map(Value::from).unwrap_or(Value::Null);
                record.insert(col.name.clone(), value);
            }
            Value::Object(record)
        })
        .collect();

    let body = if records.is_empty() {
        json!({ "columns": table.column_names(), "records": records })
    } else {
        Value::Array(records)
    };

    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, &body)
        .map_err(|e| AppError::io(format!("Failed to write JSON '{}': {e}", path.display())))
}

/// Read a table previously written by [`persist`]; the format follows the extension.
pub fn read_table(path: &Path) -> Result<ObservationTable, AppError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("csv") => read_csv(path),
        Some("json") => read_json(path),
        _ => Err(AppError::invalid(format!(
            "Unsupported table file '{}': expected .csv or .json.",
            path.display()
        ))),
    }
}

fn read_csv(path: &Path) -> Result<ObservationTable, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open CSV '{}': {e}", path.display())))?;
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AppError::parse(format!("Failed to read CSV headers: {e}")))?
        .clone();
    let names = column_names_after_date(&headers)?;

    let mut dates = Vec::new();
    let mut columns: Vec<Column> = names
        .into_iter()
        .map(|name| Column { name, values: Vec::new() })
        .collect();

    for (idx, result) in reader.records().enumerate() {
        // +2: 1-based lines, plus the header row.
        let line = idx + 2;
        let record = result.map_err(|e| AppError::parse(format!("CSV parse error on line {line}: {e}")))?;
        dates.push(parse_date(record.get(0).unwrap_or(""))?);
        for (c, col) in columns.iter_mut().enumerate() {
            let raw = record.get(c + 1).unwrap_or("");
            col.values.push(parse_cell(raw, line)?);
        }
    }

    ObservationTable::new(dates, columns)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonTable {
    Records(Vec<Map<String, Value>>),
    WithColumns {
        columns: Vec<String>,
        records: Vec<Map<String, Value>>,
    },
}

fn read_json(path: &Path) -> Result<ObservationTable, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open JSON '{}': {e}", path.display())))?;
    let body: JsonTable = serde_json::from_reader(file)
        .map_err(|e| AppError::parse(format!("Invalid table JSON '{}': {e}", path.display())))?;

    let (names, records): (Vec<String>, _) = match body {
        JsonTable::Records(records) => {
            let names = records
                .first()
                .map(|r| r.keys().filter(|k| k.as_str() != "date").cloned().collect())
                .unwrap_or_default();
            (names, records)
        }
        JsonTable::WithColumns { columns, records } => (columns, records),
    };

    let mut dates = Vec::with_capacity(records.len());
    let mut values: HashMap<&str, Vec<Option<f64>>> = names.iter().map(|n| (n.as_str(), Vec::new())).collect();

    for record in &records {
        let date = record
            .get("date")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::parse("Table JSON record is missing a `date` string."))?;
        dates.push(parse_date(date)?);
        for name in &names {
            let v = match record.get(name) {
                None | Some(Value::Null) => None,
                Some(v) => Some(
                    v.as_f64()
                        .ok_or_else(|| AppError::parse(format!("Non-numeric value for `{name}`: {v}")))?,
                ),
            };
            if let Some(col) = values.get_mut(name.as_str()) {
                col.push(v);
            }
        }
    }

    let columns = names
        .iter()
        .map(|name| Column {
            name: name.clone(),
            values: values.remove(name.as_str()).unwrap_or_default(),
        })
        .collect();
    ObservationTable::new(dates, columns)
}

fn column_names_after_date(headers: &StringRecord) -> Result<Vec<String>, AppError> {
    let mut iter = headers.iter();
    let first = iter
        .next()
        .map(|h| h.trim().trim_start_matches('\u{feff}').to_ascii_lowercase());
    if first.as_deref() != Some("date") {
        return Err(AppError::parse("Table CSV must start with a `date` column."));
    }
    Ok(iter.map(str::to_string).collect())
}

/// Accepts plain ISO dates and ISO timestamps (the date part is kept).
fn parse_date(s: &str) -> Result<NaiveDate, AppError> {
    let head = s.trim().get(..10).unwrap_or(s.trim());
    NaiveDate::parse_from_str(head, "%Y-%m-%d")
        .map_err(|e| AppError::parse(format!("Invalid date '{s}': {e}")))
}

fn parse_cell(raw: &str, line: usize) -> Result<Option<f64>, AppError> {
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<f64>()
        .map(Some)
        .map_err(|e| AppError::parse(format!("Invalid number '{raw}' on line {line}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ObservationTable {
        let d = |m| NaiveDate::from_ymd_opt(2021, m, 1).unwrap();
        ObservationTable::single("GDP", vec![(d(1), Some(22_038.226)), (d(4), None), (d(7), Some(0.1 + 0.2))])
    }

    fn dirs(root: &Path) -> DataDirs {
        DataDirs {
            raw: root.join("raw_data"),
            clean: root.join("clean_data"),
        }
    }

    #[test]
    fn raw_and_cleaned_paths_are_disjoint() {
        let dirs = DataDirs::default();
        let raw = table_path(&dirs, "GDP", Destination::Raw, FileFormat::Csv);
        let clean = table_path(&dirs, "GDP", Destination::Clean, FileFormat::Csv);
        assert_eq!(raw, PathBuf::from("raw_data/GDP_raw.csv"));
        assert_eq!(clean, PathBuf::from("clean_data/GDP_cleaned.csv"));
    }

    #[test]
    fn csv_persist_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let table = sample();
        let path = persist(&table, "GDP", Destination::Raw, FileFormat::Csv, &dirs(tmp.path())).unwrap();
        assert!(path.ends_with("raw_data/GDP_raw.csv"));
        assert_eq!(read_table(&path).unwrap(), table);
    }

    #[test]
    fn json_persist_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let table = sample();
        let path = persist(&table, "GDP", Destination::Clean, FileFormat::Json, &dirs(tmp.path())).unwrap();
        assert!(path.ends_with("clean_data/GDP_cleaned.json"));
        assert_eq!(read_table(&path).unwrap(), table);
    }

    #[test]
    fn empty_json_table_keeps_its_columns() {
        let tmp = tempfile::tempdir().unwrap();
        let empty = ObservationTable::single("UNRATE", Vec::new());
        let path = persist(&empty, "UNRATE", Destination::Clean, FileFormat::Json, &dirs(tmp.path())).unwrap();

        let back = read_table(&path).unwrap();
        assert!(back.is_empty());
        assert_eq!(back.column_names(), vec!["UNRATE"]);
        assert_eq!(back, empty);
    }

    #[test]
    fn persist_reports_unwritable_directory() {
        let tmp = tempfile::tempdir().unwrap();
        // A regular file where the directory should be.
        let blocker = tmp.path().join("raw_data");
        std::fs::write(&blocker, b"").unwrap();
        let err = persist(&sample(), "GDP", Destination::Raw, FileFormat::Csv, &dirs(tmp.path())).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Io);
    }

    #[test]
    fn read_accepts_timestamp_dates() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("x.json");
        std::fs::write(&path, r#"[{"date":"2020-01-01T00:00:00.000","UNRATE":3.5}]"#).unwrap();
        let table = read_table(&path).unwrap();
        assert_eq!(table.dates(), &[NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()]);
        assert_eq!(table.column("UNRATE").unwrap().values, vec![Some(3.5)]);
    }
}
