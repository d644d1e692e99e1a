//! Straight-line trend over the position index

use crate::error::Result;
use crate::models::{ensure_history, FittedModel, ForecastModel, IndexedSeries};
use series_math::LinearRegression;

/// Least squares line `value = intercept + slope * index`
#[derive(Debug, Clone, Default)]
pub struct LinearTrend;

/// Fitted linear trend
#[derive(Debug, Clone)]
pub struct FittedLinearTrend {
    line: LinearRegression,
}

impl LinearTrend {
    pub fn new() -> Self {
        Self
    }
}

impl ForecastModel for LinearTrend {
    fn name(&self) -> &str {
        "linear_trend"
    }

    fn fit(&self, history: &IndexedSeries) -> Result<Box<dyn FittedModel>> {
        ensure_history(self, history)?;
        let points: Vec<(f64, f64)> = history.points().map(|(i, v)| (i as f64, v)).collect();
        let line = LinearRegression::fit(&points)?;
        Ok(Box::new(FittedLinearTrend { line }))
    }
}

impl FittedLinearTrend {
    pub fn slope(&self) -> f64 {
        self.line.slope()
    }

    pub fn intercept(&self) -> f64 {
        self.line.intercept()
    }
}

impl FittedModel for FittedLinearTrend {
    fn predict(&self, indices: &[usize]) -> Result<Vec<f64>> {
        Ok(indices.iter().map(|&i| self.line.predict(i as f64)).collect())
    }

    fn name(&self) -> &str {
        "linear_trend"
    }
}
