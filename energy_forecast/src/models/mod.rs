//! Forecasting models for per-cell metric series
//!
//! Every model regresses on the zero-based position of a sample in the
//! cell's history, never on its timestamp. A history of length `n` occupies
//! indices `0..n`; a horizon of `h` ticks is predicted at `n..n + h`. Gaps
//! in the calendar therefore do not exist from a model's point of view.

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use std::str::FromStr;
use std::sync::Arc;

pub mod exponential_smoothing;
pub mod linear;
pub mod moving_average;
pub mod seasonal;

pub use exponential_smoothing::HoltModel;
pub use linear::LinearTrend;
pub use moving_average::MovingAverage;
pub use seasonal::SeasonalModel;

/// Ordered metric history where each value's index is its position
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedSeries {
    values: Vec<f64>,
}

impl IndexedSeries {
    pub fn from_values(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// `(index, value)` pairs in order
    pub fn points(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.values.iter().copied().enumerate()
    }

    /// In-sample indices `0..len`
    pub fn indices(&self) -> Vec<usize> {
        (0..self.values.len()).collect()
    }

    /// The `horizon` indices directly after the history
    pub fn future_indices(&self, horizon: usize) -> Vec<usize> {
        (self.values.len()..self.values.len() + horizon).collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A model fitted to one history
pub trait FittedModel: Debug + Send {
    /// Predict one value per index, in the same order
    fn predict(&self, indices: &[usize]) -> Result<Vec<f64>>;

    /// Name of the model
    fn name(&self) -> &str;
}

/// Forecast model that can be fitted to an indexed history
pub trait ForecastModel: Debug + Send + Sync {
    /// Short identifier, also used in output file names
    fn name(&self) -> &str;

    /// Fewest history points this model can fit
    fn min_history(&self) -> usize {
        2
    }

    /// Fit the model to the history
    fn fit(&self, history: &IndexedSeries) -> Result<Box<dyn FittedModel>>;
}

/// Reject histories shorter than the model's minimum
pub(crate) fn ensure_history(model: &dyn ForecastModel, history: &IndexedSeries) -> Result<()> {
    if history.len() < model.min_history() {
        return Err(ForecastError::InsufficientData(format!(
            "{} needs at least {} points, got {}",
            model.name(),
            model.min_history(),
            history.len()
        )));
    }
    Ok(())
}

/// In-sample coefficient of determination of a fitted model.
///
/// NaN when the history has zero variance.
pub fn score(model: &dyn FittedModel, history: &IndexedSeries) -> Result<f64> {
    let fitted = model.predict(&history.indices())?;
    Ok(series_math::r_squared(history.values(), &fitted)?)
}

/// Registry of the available models and their parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelKind {
    /// Least squares line through the history
    LinearTrend,
    /// Holt double exponential smoothing
    HoltSmoothing { alpha: f64, beta: f64 },
    /// Mean of the trailing window, held flat
    MovingAverage { window: usize },
    /// Trend plus repeating per-slot profile, `period` in ticks
    SeasonalProfile { period: usize },
}

impl ModelKind {
    /// Build the model
    pub fn build(&self) -> Result<Arc<dyn ForecastModel>> {
        let model: Arc<dyn ForecastModel> = match self {
            ModelKind::LinearTrend => Arc::new(LinearTrend::new()),
            ModelKind::HoltSmoothing { alpha, beta } => Arc::new(HoltModel::new(*alpha, *beta)?),
            ModelKind::MovingAverage { window } => Arc::new(MovingAverage::new(*window)?),
            ModelKind::SeasonalProfile { period } => Arc::new(SeasonalModel::new(*period)?),
        };
        Ok(model)
    }

    /// Identifier shared with the built model's `name()`
    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::LinearTrend => "linear_trend",
            ModelKind::HoltSmoothing { .. } => "holt",
            ModelKind::MovingAverage { .. } => "moving_average",
            ModelKind::SeasonalProfile { .. } => "seasonal_profile",
        }
    }

    /// Models run when nothing else is configured
    pub fn defaults() -> Vec<ModelKind> {
        vec![
            ModelKind::LinearTrend,
            ModelKind::HoltSmoothing {
                alpha: 0.3,
                beta: 0.1,
            },
            ModelKind::SeasonalProfile { period: 96 },
        ]
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelKind {
    type Err = ForecastError;

    /// Parse a model identifier with default parameters
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "linear_trend" | "linear" => Ok(ModelKind::LinearTrend),
            "holt" | "holt_smoothing" => Ok(ModelKind::HoltSmoothing {
                alpha: 0.3,
                beta: 0.1,
            }),
            "moving_average" | "ma" => Ok(ModelKind::MovingAverage { window: 96 }),
            "seasonal_profile" | "seasonal" => Ok(ModelKind::SeasonalProfile { period: 96 }),
            other => Err(ForecastError::InvalidParameter(format!(
                "Unknown model '{}'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_future_indices_follow_history() {
        let series = IndexedSeries::from_values(vec![1.0, 2.0, 3.0]);
        assert_eq!(series.indices(), vec![0, 1, 2]);
        assert_eq!(series.future_indices(2), vec![3, 4]);
    }

    #[test]
    fn test_kind_names_match_models() {
        for kind in ModelKind::defaults() {
            assert_eq!(kind.build().unwrap().name(), kind.name());
        }
        let ma = ModelKind::MovingAverage { window: 4 };
        assert_eq!(ma.build().unwrap().name(), ma.name());
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("linear".parse::<ModelKind>().unwrap(), ModelKind::LinearTrend);
        assert!("arima".parse::<ModelKind>().is_err());
    }
}
