//! Holt double exponential smoothing

use crate::error::Result;
use crate::models::{ensure_history, FittedModel, ForecastModel, IndexedSeries};
use series_math::smoothing::HoltFit;
use series_math::HoltSmoothing;

/// Holt level-and-trend smoothing model
#[derive(Debug, Clone)]
pub struct HoltModel {
    smoother: HoltSmoothing,
}

/// Trained Holt model
#[derive(Debug, Clone)]
pub struct TrainedHoltModel {
    fit: HoltFit,
}

impl HoltModel {
    /// Create a new Holt model; both factors must lie in (0, 1)
    pub fn new(alpha: f64, beta: f64) -> Result<Self> {
        Ok(Self {
            smoother: HoltSmoothing::new(alpha, beta)?,
        })
    }
}

impl ForecastModel for HoltModel {
    fn name(&self) -> &str {
        "holt"
    }

    fn fit(&self, history: &IndexedSeries) -> Result<Box<dyn FittedModel>> {
        ensure_history(self, history)?;
        let fit = self.smoother.fit(history.values())?;
        Ok(Box::new(TrainedHoltModel { fit }))
    }
}

impl FittedModel for TrainedHoltModel {
    /// One-step-ahead fitted values inside the history, level plus
    /// `k` trends for the `k`-th index after it
    fn predict(&self, indices: &[usize]) -> Result<Vec<f64>> {
        Ok(indices.iter().map(|&i| self.fit.at(i)).collect())
    }

    fn name(&self) -> &str {
        "holt"
    }
}
