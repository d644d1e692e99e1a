//! Moving average model

use crate::error::{ForecastError, Result};
use crate::models::{ensure_history, FittedModel, ForecastModel, IndexedSeries};
use series_math::trailing_mean;

/// Simple Moving Average model
#[derive(Debug, Clone)]
pub struct MovingAverage {
    /// Window size
    window: usize,
}

/// Trained Simple Moving Average model
#[derive(Debug, Clone)]
pub struct TrainedMovingAverage {
    /// Prediction for each in-sample index, from values strictly before it
    fitted: Vec<f64>,
    /// Last calculated average
    last_average: f64,
}

impl MovingAverage {
    /// Create a new Simple Moving Average model
    pub fn new(window: usize) -> Result<Self> {
        if window == 0 {
            return Err(ForecastError::InvalidParameter(
                "Window size must be positive".to_string(),
            ));
        }

        Ok(Self { window })
    }

    pub fn window(&self) -> usize {
        self.window
    }
}

impl ForecastModel for MovingAverage {
    fn name(&self) -> &str {
        "moving_average"
    }

    fn fit(&self, history: &IndexedSeries) -> Result<Box<dyn FittedModel>> {
        ensure_history(self, history)?;
        let values = history.values();
        let means = trailing_mean(values, self.window)?;

        // The first point has no past, so it predicts itself
        let mut fitted = Vec::with_capacity(values.len());
        fitted.push(values[0]);
        fitted.extend_from_slice(&means[..means.len() - 1]);

        Ok(Box::new(TrainedMovingAverage {
            fitted,
            last_average: means[means.len() - 1],
        }))
    }
}

impl FittedModel for TrainedMovingAverage {
    fn predict(&self, indices: &[usize]) -> Result<Vec<f64>> {
        Ok(indices
            .iter()
            .map(|&i| self.fitted.get(i).copied().unwrap_or(self.last_average))
            .collect())
    }

    fn name(&self) -> &str {
        "moving_average"
    }
}
