//! Centered rolling mean used for the dashed trend overlay.

/// Centered moving average over `window` samples.
///
/// Output slot `i` averages `values[i - window/2 .. i - window/2 + window]`.
/// Slots whose window runs past either end, or contains a missing value,
/// are `None`. For even windows the extra sample falls before `i`.
pub fn centered_rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let n = values.len();
    if window == 0 {
        return vec![None; n];
    }
    let half = window / 2;

    (0..n)
        .map(|i| {
            let start = i.checked_sub(half)?;
            let end = start + window;
            if end > n {
                return None;
            }
            let slice = &values[start..end];
            let sum = slice.iter().try_fold(0.0, |acc, v| v.map(|x| acc + x))?;
            Some(sum / window as f64)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_of_twelve_is_offset_six_back_five_forward() {
        let values: Vec<Option<f64>> = (0..24).map(|i| Some(i as f64)).collect();
        let trend = centered_rolling_mean(&values, 12);

        assert_eq!(trend.len(), 24);
        assert!(trend[..6].iter().all(Option::is_none));
        assert!(trend[19..].iter().all(Option::is_none));
        // values[0..12] -> mean 5.5, centered on index 6.
        assert_eq!(trend[6], Some(5.5));
        assert_eq!(trend[18], Some(17.5));
    }

    #[test]
    fn odd_window_is_symmetric() {
        let values = vec![Some(1.0), Some(2.0), Some(6.0), Some(4.0)];
        let trend = centered_rolling_mean(&values, 3);
        assert_eq!(trend, vec![None, Some(3.0), Some(4.0), None]);
    }

    #[test]
    fn missing_values_blank_their_windows() {
        let values = vec![Some(1.0), None, Some(3.0), Some(5.0), Some(7.0)];
        let trend = centered_rolling_mean(&values, 3);
        assert_eq!(trend, vec![None, None, None, Some(5.0), None]);
    }

    #[test]
    fn short_series_yield_no_trend() {
        let values = vec![Some(1.0); 5];
        assert!(centered_rolling_mean(&values, 12).iter().all(Option::is_none));
        assert!(centered_rolling_mean(&[], 12).is_empty());
    }
}
