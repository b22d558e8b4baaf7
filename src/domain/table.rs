//! Date-indexed observation tables.

use chrono::NaiveDate;

use crate::error::AppError;

/// One named column of (possibly missing) values.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

/// A date index plus one or more named columns.
///
/// Every column has exactly one value slot per index entry; a missing
/// observation is `None`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObservationTable {
    dates: Vec<NaiveDate>,
    columns: Vec<Column>,
}

impl ObservationTable {
    pub fn new(dates: Vec<NaiveDate>, columns: Vec<Column>) -> Result<Self, AppError> {
        for col in &columns {
            if col.values.len() != dates.len() {
                return Err(AppError::invalid(format!(
                    "Column '{}' has {} values for {} dates.",
                    col.name,
                    col.values.len(),
                    dates.len()
                )));
            }
        }
        Ok(Self { dates, columns })
    }

    /// Build a single-column table from `(date, value)` observations.
    pub fn single(name: impl Into<String>, observations: Vec<(NaiveDate, Option<f64>)>) -> Self {
        let (dates, values) = observations.into_iter().unzip();
        Self {
            dates,
            columns: vec![Column {
                name: name.into(),
                values,
            }],
        }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn has_missing(&self) -> bool {
        self.columns.iter().any(|c| c.values.iter().any(Option::is_none))
    }

    /// Rename the only column of a single-series table.
    pub fn rename_sole_column(&mut self, name: impl Into<String>) -> Result<(), AppError> {
        match self.columns.as_mut_slice() {
            [only] => {
                only.name = name.into();
                Ok(())
            }
            cols => Err(AppError::invalid(format!(
                "Expected a single-column table, found {} columns.",
                cols.len()
            ))),
        }
    }

    /// Non-missing `(date, value)` pairs of the first column.
    pub fn valid_points(&self) -> Vec<(NaiveDate, f64)> {
        let Some(col) = self.columns.first() else {
            return Vec::new();
        };
        self.dates
            .iter()
            .zip(&col.values)
            .filter_map(|(d, v)| v.map(|v| (*d, v)))
            .collect()
    }

    pub(crate) fn columns_mut(&mut self) -> &mut [Column] {
        &mut self.columns
    }

    /// Keep only the rows whose index satisfies `keep`.
    pub(crate) fn retain_rows(&mut self, keep: impl Fn(usize) -> bool) {
        let kept: Vec<usize> = (0..self.dates.len()).filter(|&i| keep(i)).collect();
        self.dates = kept.iter().map(|&i| self.dates[i]).collect();
        for col in &mut self.columns {
            col.values = kept.iter().map(|&i| col.values[i]).collect();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, m, 1).unwrap()
    }

    #[test]
    fn new_rejects_ragged_columns() {
        let cols = vec![Column {
            name: "X".to_string(),
            values: vec![Some(1.0)],
        }];
        assert!(ObservationTable::new(vec![d(1), d(2)], cols).is_err());
    }

    #[test]
    fn rename_sole_column_requires_one_column() {
        let mut table = ObservationTable::single("UNRATE", vec![(d(1), Some(3.5))]);
        table.rename_sole_column("Unemployment Rate (Overall)").unwrap();
        assert_eq!(table.column_names(), vec!["Unemployment Rate (Overall)"]);

        let two = vec![
            Column { name: "A".to_string(), values: vec![Some(1.0)] },
            Column { name: "B".to_string(), values: vec![None] },
        ];
        let mut table = ObservationTable::new(vec![d(1)], two).unwrap();
        assert!(table.rename_sole_column("C").is_err());
    }

    #[test]
    fn valid_points_skips_missing() {
        let table = ObservationTable::single("X", vec![(d(1), Some(1.0)), (d(2), None), (d(3), Some(3.0))]);
        assert_eq!(table.valid_points(), vec![(d(1), 1.0), (d(3), 3.0)]);
        assert!(table.has_missing());
    }
}
