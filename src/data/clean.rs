//! Missing-value policies.
//!
//! Each policy works column by column on a copy of the table; the input is
//! never modified.

use crate::domain::{CleaningPolicy, ObservationTable};
use crate::error::AppError;

/// Clean `table` with the policy named `method`.
///
/// Unknown names fail with `ErrorKind::InvalidParameter` regardless of the
/// table contents.
pub fn clean(table: &ObservationTable, method: &str) -> Result<ObservationTable, AppError> {
    let policy: CleaningPolicy = method.parse()?;
    Ok(apply_policy(table, policy))
}

pub fn apply_policy(table: &ObservationTable, policy: CleaningPolicy) -> ObservationTable {
    let mut out = table.clone();
    match policy {
        CleaningPolicy::Drop => {
            let complete: Vec<bool> = (0..out.len())
                .map(|i| out.columns().iter().all(|c| c.values[i].is_some()))
                .collect();
            out.retain_rows(|i| complete[i]);
        }
        CleaningPolicy::ForwardFill => {
            for col in out.columns_mut() {
                forward_fill(&mut col.values);
            }
        }
        CleaningPolicy::Interpolate => {
            for col in out.columns_mut() {
                interpolate_linear(&mut col.values);
            }
        }
        CleaningPolicy::Zero => {
            for col in out.columns_mut() {
                for v in col.values.iter_mut() {
                    v.get_or_insert(0.0);
                }
            }
        }
    }
    out
}

fn forward_fill(values: &mut [Option<f64>]) {
    let mut last = None;
    for v in values.iter_mut() {
        match *v {
            Some(x) => last = Some(x),
            None => *v = last,
        }
    }
}

/// Linear interpolation by position.
///
/// Leading gaps stay missing; trailing gaps take the last valid value.
fn interpolate_linear(values: &mut [Option<f64>]) {
    let mut prev: Option<(usize, f64)> = None;
    let mut i = 0;
    while i < values.len() {
        let Some(x) = values[i] else {
            i += 1;
            continue;
        };
        if let Some((j, y0)) = prev {
            let span = (i - j) as f64;
            for (k, slot) in values.iter_mut().enumerate().take(i).skip(j + 1) {
                let t = (k - j) as f64 / span;
                *slot = Some(y0 + t * (x - y0));
            }
        }
        prev = Some((i, x));
        i += 1;
    }

    if let Some((j, last)) = prev {
        for slot in values.iter_mut().skip(j + 1) {
            *slot = Some(last);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Column;
    use crate::error::ErrorKind;
    use chrono::NaiveDate;

    fn table(values: &[Option<f64>]) -> ObservationTable {
        let obs = values
            .iter()
            .enumerate()
            .map(|(i, v)| (NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + chrono::Duration::days(i as i64), *v))
            .collect();
        ObservationTable::single("X", obs)
    }

    fn values(t: &ObservationTable) -> Vec<Option<f64>> {
        t.columns()[0].values.clone()
    }

    #[test]
    fn drop_removes_incomplete_rows_across_columns() {
        let dates: Vec<NaiveDate> = (1..=4).map(|m| NaiveDate::from_ymd_opt(2020, m, 1).unwrap()).collect();
        let cols = vec![
            Column { name: "A".to_string(), values: vec![Some(1.0), None, Some(3.0), Some(4.0)] },
            Column { name: "B".to_string(), values: vec![Some(1.0), Some(2.0), None, Some(4.0)] },
        ];
        let t = ObservationTable::new(dates.clone(), cols).unwrap();
        let out = apply_policy(&t, CleaningPolicy::Drop);
        assert_eq!(out.dates(), &[dates[0], dates[3]]);
        assert!(!out.has_missing());
    }

    #[test]
    fn forward_fill_leaves_leading_gap() {
        let out = apply_policy(&table(&[None, Some(1.0), None, None, Some(4.0), None]), CleaningPolicy::ForwardFill);
        assert_eq!(values(&out), vec![None, Some(1.0), Some(1.0), Some(1.0), Some(4.0), Some(4.0)]);
    }

    #[test]
    fn interpolate_is_linear_between_neighbours() {
        let out = apply_policy(&table(&[None, Some(1.0), None, None, Some(4.0), None]), CleaningPolicy::Interpolate);
        assert_eq!(values(&out), vec![None, Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(4.0)]);
    }

    #[test]
    fn interpolated_values_are_bounded_by_neighbours() {
        let out = apply_policy(&table(&[Some(5.0), None, None, None, Some(1.0)]), CleaningPolicy::Interpolate);
        let v = values(&out);
        for w in v.windows(2) {
            let (a, b) = (w[0].unwrap(), w[1].unwrap());
            assert!(b <= a, "expected non-increasing, got {a} -> {b}");
        }
        assert!(v.iter().all(|x| (1.0..=5.0).contains(&x.unwrap())));
    }

    #[test]
    fn zero_fills_without_changing_row_count() {
        let t = table(&[Some(1.0), None, Some(3.0)]);
        let out = apply_policy(&t, CleaningPolicy::Zero);
        assert_eq!(out.len(), t.len());
        assert_eq!(values(&out), vec![Some(1.0), Some(0.0), Some(3.0)]);
    }

    #[test]
    fn no_policy_leaves_interior_missing_values() {
        let t = table(&[Some(2.0), None, Some(3.0), None, None, Some(1.0)]);
        for policy in CleaningPolicy::ALL {
            assert!(!apply_policy(&t, policy).has_missing(), "{policy:?}");
        }
    }

    #[test]
    fn invalid_method_fails_for_any_table() {
        for t in [ObservationTable::default(), table(&[]), table(&[Some(1.0), None])] {
            let err = clean(&t, "invalid").unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        }
    }

    #[test]
    fn clean_does_not_modify_input() {
        let t = table(&[Some(1.0), None]);
        let _ = clean(&t, "zero").unwrap();
        assert_eq!(values(&t), vec![Some(1.0), None]);
    }
}
