//! Summary statistics and fit quality

use crate::{MathError, Result};
use statrs::statistics::Statistics;

/// Arithmetic mean; NaN for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    values.iter().mean()
}

/// Sum of squared deviations from the mean
pub fn total_sum_of_squares(values: &[f64]) -> f64 {
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum()
}

/// Sum of squared differences between observed and fitted values
pub fn residual_sum_of_squares(observed: &[f64], fitted: &[f64]) -> f64 {
    observed
        .iter()
        .zip(fitted)
        .map(|(o, f)| (o - f).powi(2))
        .sum()
}

/// Coefficient of determination `1 - SSres / SStot`.
///
/// A zero-variance series has no defined score and yields NaN, which is a
/// valid result rather than an error. Variance counts as zero only when it
/// is within rounding of the series' own magnitude, so small-scale series
/// still get a score.
pub fn r_squared(observed: &[f64], fitted: &[f64]) -> Result<f64> {
    if observed.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot score an empty series".to_string(),
        ));
    }
    if observed.len() != fitted.len() {
        return Err(MathError::InvalidInput(format!(
            "Observed length ({}) doesn't match fitted length ({})",
            observed.len(),
            fitted.len()
        )));
    }

    let ss_total = total_sum_of_squares(observed);
    let magnitude: f64 = observed.iter().map(|v| v * v).sum();
    if ss_total <= f64::EPSILON * magnitude {
        return Ok(f64::NAN);
    }

    Ok(1.0 - residual_sum_of_squares(observed, fitted) / ss_total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean() {
        assert_relative_eq!(mean(&[1.0, 2.0, 3.0, 6.0]), 3.0);
        assert!(mean(&[]).is_nan());
    }

    #[test]
    fn test_r_squared_perfect_and_mean_fit() {
        let observed = [1.0, 2.0, 3.0];
        assert_relative_eq!(r_squared(&observed, &observed).unwrap(), 1.0);
        assert_relative_eq!(r_squared(&observed, &[2.0, 2.0, 2.0]).unwrap(), 0.0);
    }

    #[test]
    fn test_r_squared_zero_variance_is_nan() {
        let score = r_squared(&[4.0, 4.0, 4.0], &[4.0, 4.0, 4.0]).unwrap();
        assert!(score.is_nan());
    }

    #[test]
    fn test_r_squared_small_scale_series() {
        let observed = [1e-7, 2e-7, 3e-7];
        assert_relative_eq!(r_squared(&observed, &observed).unwrap(), 1.0);
        assert_relative_eq!(r_squared(&observed, &[2e-7, 2e-7, 2e-7]).unwrap(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_r_squared_constant_with_rounding_is_nan() {
        assert!(r_squared(&[0.1; 7], &[0.1; 7]).unwrap().is_nan());
        assert!(r_squared(&[0.0; 3], &[0.0; 3]).unwrap().is_nan());
    }

    #[test]
    fn test_r_squared_length_mismatch() {
        assert!(r_squared(&[1.0, 2.0], &[1.0]).is_err());
    }
}
