//! Linear trend with a repeating seasonal profile

use crate::regression::LinearRegression;
use crate::{MathError, Result};

/// Trend line plus the mean residual of each slot `position % period`
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonalProfile {
    trend: LinearRegression,
    offsets: Vec<f64>,
}

impl SeasonalProfile {
    /// Fit the trend on positions, then average residuals per seasonal slot.
    ///
    /// Slots the history never reached get a zero offset.
    pub fn fit(values: &[f64], period: usize) -> Result<Self> {
        if period == 0 {
            return Err(MathError::InvalidInput(
                "Seasonal period must be positive".to_string(),
            ));
        }

        let trend = LinearRegression::fit_indexed(values)?;

        let mut sums = vec![0.0; period];
        let mut counts = vec![0usize; period];
        for (i, &value) in values.iter().enumerate() {
            let slot = i % period;
            sums[slot] += value - trend.predict(i as f64);
            counts[slot] += 1;
        }

        let offsets = sums
            .iter()
            .zip(&counts)
            .map(|(sum, &count)| if count == 0 { 0.0 } else { sum / count as f64 })
            .collect();

        Ok(Self { trend, offsets })
    }

    /// Value at position `index`
    pub fn predict(&self, index: usize) -> f64 {
        self.trend.predict(index as f64) + self.offsets[index % self.offsets.len()]
    }

    pub fn period(&self) -> usize {
        self.offsets.len()
    }

    pub fn offsets(&self) -> &[f64] {
        &self.offsets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_repeats_flat_cycle() {
        let values: Vec<f64> = (0..12).map(|i| [1.0, 5.0, 3.0][i % 3]).collect();
        let profile = SeasonalProfile::fit(&values, 3).unwrap();

        assert_eq!(profile.period(), 3);
        assert_relative_eq!(profile.predict(12), 1.0, epsilon = 0.5);
        assert_relative_eq!(profile.predict(13), 5.0, epsilon = 0.5);
        assert_relative_eq!(profile.predict(14), 3.0, epsilon = 0.5);
    }

    #[test]
    fn test_zero_period() {
        assert!(SeasonalProfile::fit(&[1.0, 2.0], 0).is_err());
    }
}
