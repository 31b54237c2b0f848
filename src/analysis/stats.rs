//! Summary statistics over a slice of replicate values.

/// Arithmetic mean. NaN for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance with an n - 1 denominator.
///
/// Returns `None` when there are fewer than two values.
pub fn sample_variance(values: &[f64], mean: f64) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    Some(ss / (values.len() - 1) as f64)
}

/// Standard deviation over mean. NaN when the mean is zero.
pub fn coefficient_of_variation(stddev: f64, mean: f64) -> f64 {
    if mean == 0.0 {
        f64::NAN
    } else {
        stddev / mean
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn test_mean() {
        assert!((mean(&[0.002, 0.004]) - 0.003).abs() < EPS);
        assert!(mean(&[]).is_nan());
    }

    #[test]
    fn test_sample_variance() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let m = mean(&values);
        assert_eq!(m, 5.0);
        // Sum of squares is 32 over 7 degrees of freedom.
        assert!((sample_variance(&values, m).unwrap() - 32.0 / 7.0).abs() < EPS);
    }

    #[test]
    fn test_variance_needs_two_values() {
        assert_eq!(sample_variance(&[1.0], 1.0), None);
        assert_eq!(sample_variance(&[], f64::NAN), None);
    }

    #[test]
    fn test_cv_zero_mean_is_nan() {
        assert!(coefficient_of_variation(0.0, 0.0).is_nan());
        assert!(coefficient_of_variation(1.0, 0.0).is_nan());
        assert!((coefficient_of_variation(1.0, 4.0) - 0.25).abs() < EPS);
    }
}
