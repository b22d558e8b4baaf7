//! Descriptive statistics and key insights over summary records.

use crate::domain::{ObservationTable, SummaryRecord};

/// Summarize the non-missing values of a single-column table.
///
/// Returns `None` when the table has no valid observation.
pub fn summarize(label: &str, table: &ObservationTable) -> Option<SummaryRecord> {
    let values: Vec<f64> = table.valid_points().into_iter().map(|(_, v)| v).collect();
    let first = *values.first()?;
    let latest = *values.last()?;

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;

    // Sample std dev (n - 1); undefined for a single observation.
    let std_dev = if values.len() >= 2 {
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        Some(variance.sqrt())
    } else {
        None
    };

    Some(SummaryRecord {
        label: label.to_string(),
        mean,
        median: median(&values),
        std_dev,
        min: values.iter().copied().fold(f64::INFINITY, f64::min),
        max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        count: values.len(),
        latest,
        change: latest - first,
    })
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Round to two decimals for tables and console output.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Headline rows picked from a statistics table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Insights {
    pub highest_mean: Option<SummaryRecord>,
    pub lowest_mean: Option<SummaryRecord>,
    pub most_volatile: Option<SummaryRecord>,
    /// Most negative first-to-last change (only filled when requested).
    pub most_improved: Option<SummaryRecord>,
}

/// Pick the headline rows.
///
/// Selection compares the published two-decimal values, so rows that print
/// the same tie, and ties go to the earliest row.
pub fn compute_insights(records: &[SummaryRecord], include_improved: bool) -> Insights {
    Insights {
        highest_mean: first_extreme(records, |r| Some(round2(r.mean)), Extreme::Max),
        lowest_mean: first_extreme(records, |r| Some(round2(r.mean)), Extreme::Min),
        most_volatile: first_extreme(records, |r| r.std_dev.map(round2), Extreme::Max),
        most_improved: if include_improved {
            first_extreme(records, |r| Some(round2(r.change)), Extreme::Min)
        } else {
            None
        },
    }
}

#[derive(Clone, Copy)]
enum Extreme {
    Max,
    Min,
}

fn first_extreme(
    records: &[SummaryRecord],
    key: impl Fn(&SummaryRecord) -> Option<f64>,
    extreme: Extreme,
) -> Option<SummaryRecord> {
    let mut best: Option<(f64, &SummaryRecord)> = None;
    for r in records {
        let Some(v) = key(r).filter(|v| v.is_finite()) else {
            continue;
        };
        let better = match (best, extreme) {
            (None, _) => true,
            (Some((b, _)), Extreme::Max) => v > b,
            (Some((b, _)), Extreme::Min) => v < b,
        };
        if better {
            best = Some((v, r));
        }
    }
    best.map(|(_, r)| r.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn table(values: &[Option<f64>]) -> ObservationTable {
        let start = NaiveDate::from_ymd_opt(2015, 1, 1).unwrap();
        ObservationTable::single(
            "X",
            values
                .iter()
                .enumerate()
                .map(|(i, v)| (start + chrono::Months::new(i as u32), *v))
                .collect(),
        )
    }

    fn record(label: &str, mean: f64, std_dev: Option<f64>, change: f64) -> SummaryRecord {
        SummaryRecord {
            label: label.to_string(),
            mean,
            median: mean,
            std_dev,
            min: mean,
            max: mean,
            count: 2,
            latest: mean,
            change,
        }
    }

    #[test]
    fn summarize_ignores_missing_values() {
        let s = summarize("X", &table(&[Some(2.0), None, Some(4.0), Some(9.0), Some(5.0)])).unwrap();
        assert_eq!(s.count, 4);
        assert!((s.mean - 5.0).abs() < 1e-12);
        assert!((s.median - 4.5).abs() < 1e-12);
        assert_eq!(s.min, 2.0);
        assert_eq!(s.max, 9.0);
        assert_eq!(s.latest, 5.0);
        assert_eq!(s.change, 3.0);
        // Sample variance: (9 + 1 + 16 + 0) / 3
        assert!((s.std_dev.unwrap() - (26.0_f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn summarize_skips_tables_without_valid_values() {
        assert!(summarize("X", &table(&[])).is_none());
        assert!(summarize("X", &table(&[None, None])).is_none());
    }

    #[test]
    fn single_observation_has_no_std_dev() {
        let s = summarize("X", &table(&[Some(3.0)])).unwrap();
        assert_eq!(s.std_dev, None);
        assert_eq!(s.change, 0.0);
    }

    #[test]
    fn most_volatile_is_strict_maximum_and_ignores_undefined() {
        let records = vec![
            record("a", 4.0, Some(1.0), 0.5),
            record("b", 6.0, None, -2.0),
            record("c", 3.0, Some(2.5), -1.0),
            record("d", 6.0, Some(2.5), 1.0),
        ];
        let insights = compute_insights(&records, true);
        assert_eq!(insights.most_volatile.unwrap().label, "c");
        // Tie on mean: first row wins.
        assert_eq!(insights.highest_mean.unwrap().label, "b");
        assert_eq!(insights.lowest_mean.unwrap().label, "c");
        assert_eq!(insights.most_improved.unwrap().label, "b");
    }

    #[test]
    fn near_ties_that_print_equal_go_to_the_first_row() {
        let records = vec![
            record("first", 5.001, Some(2.501), -1.001),
            record("second", 5.004, Some(2.504), -1.004),
            record("third", 4.0, Some(1.0), 0.0),
        ];
        let insights = compute_insights(&records, true);
        assert_eq!(insights.highest_mean.unwrap().label, "first");
        assert_eq!(insights.most_volatile.unwrap().label, "first");
        assert_eq!(insights.most_improved.unwrap().label, "first");
        assert_eq!(insights.lowest_mean.unwrap().label, "third");
    }

    #[test]
    fn improvement_is_only_reported_when_requested() {
        let records = vec![record("a", 4.0, Some(1.0), -0.5)];
        assert!(compute_insights(&records, false).most_improved.is_none());
        assert_eq!(compute_insights(&[], true), Insights::default());
    }

    #[test]
    fn round2_matches_two_decimal_display() {
        assert_eq!(round2(4.256), 4.26);
        assert_eq!(round2(-0.804), -0.8);
        assert_eq!(round2(3.0), 3.0);
    }
}
