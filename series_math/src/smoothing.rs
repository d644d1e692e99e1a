//! Exponential smoothing and trailing averages

use crate::{MathError, Result};

/// Double Exponential Smoothing (Holt's Method)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoltSmoothing {
    alpha: f64,
    beta: f64,
}

/// State of a Holt model after consuming a whole series
#[derive(Debug, Clone, PartialEq)]
pub struct HoltFit {
    level: f64,
    trend: f64,
    /// One-step-ahead fitted value for every input position
    fitted: Vec<f64>,
}

impl HoltSmoothing {
    /// Create a new Holt smoother with level factor `alpha` and trend factor `beta`
    pub fn new(alpha: f64, beta: f64) -> Result<Self> {
        if alpha <= 0.0 || alpha >= 1.0 {
            return Err(MathError::InvalidInput(
                "Alpha must be between 0 and 1 (exclusive)".to_string(),
            ));
        }
        if beta <= 0.0 || beta >= 1.0 {
            return Err(MathError::InvalidInput(
                "Beta must be between 0 and 1 (exclusive)".to_string(),
            ));
        }

        Ok(Self { alpha, beta })
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Run the smoother over `values`.
    ///
    /// Level starts at the first value and trend at the first difference, so
    /// the first two fitted values equal the observations.
    pub fn fit(&self, values: &[f64]) -> Result<HoltFit> {
        if values.len() < 2 {
            return Err(MathError::InsufficientData(format!(
                "Holt smoothing needs at least 2 values, got {}",
                values.len()
            )));
        }

        let mut level = values[0];
        let mut trend = values[1] - values[0];
        let mut fitted = Vec::with_capacity(values.len());
        fitted.push(values[0]);

        for &value in &values[1..] {
            fitted.push(level + trend);
            let prev_level = level;
            level = self.alpha * value + (1.0 - self.alpha) * (level + trend);
            trend = self.beta * (level - prev_level) + (1.0 - self.beta) * trend;
        }

        Ok(HoltFit {
            level,
            trend,
            fitted,
        })
    }
}

impl HoltFit {
    /// Forecast `h` steps past the end of the history (`h >= 1`)
    pub fn forecast(&self, h: usize) -> f64 {
        self.level + h as f64 * self.trend
    }

    /// Value at position `index`: fitted inside the history, extrapolated after it
    pub fn at(&self, index: usize) -> f64 {
        match self.fitted.get(index) {
            Some(value) => *value,
            None => self.forecast(index + 1 - self.fitted.len()),
        }
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn trend(&self) -> f64 {
        self.trend
    }

    pub fn fitted(&self) -> &[f64] {
        &self.fitted
    }
}

/// Trailing mean over at most `window` values ending at each position.
///
/// Early positions average whatever history exists, so the output has the
/// same length as the input.
pub fn trailing_mean(values: &[f64], window: usize) -> Result<Vec<f64>> {
    if window == 0 {
        return Err(MathError::InvalidInput(
            "Window size must be positive".to_string(),
        ));
    }

    let mut result = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for (i, &value) in values.iter().enumerate() {
        sum += value;
        if i >= window {
            sum -= values[i - window];
        }
        let count = (i + 1).min(window);
        result.push(sum / count as f64);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_holt_tracks_linear_series() {
        let holt = HoltSmoothing::new(0.5, 0.5).unwrap();
        let fit = holt.fit(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();

        assert_eq!(fit.fitted().len(), 5);
        assert_relative_eq!(fit.level(), 5.0, epsilon = 1e-9);
        assert_relative_eq!(fit.trend(), 1.0, epsilon = 1e-9);
        assert_relative_eq!(fit.at(5), 6.0, epsilon = 1e-9);
        assert_relative_eq!(fit.at(7), 8.0, epsilon = 1e-9);
    }

    #[test]
    fn test_holt_rejects_bad_parameters() {
        assert!(HoltSmoothing::new(0.0, 0.5).is_err());
        assert!(HoltSmoothing::new(0.5, 1.0).is_err());
    }

    #[test]
    fn test_trailing_mean() {
        let means = trailing_mean(&[10.0, 20.0, 30.0, 40.0], 2).unwrap();
        assert_eq!(means, vec![10.0, 15.0, 25.0, 35.0]);
        assert!(trailing_mean(&[1.0], 0).is_err());
    }
}
