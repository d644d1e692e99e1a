//! Trend plus daily (or any fixed-period) profile

use crate::error::{ForecastError, Result};
use crate::models::{ensure_history, FittedModel, ForecastModel, IndexedSeries};
use series_math::SeasonalProfile;

/// Seasonal profile model.
///
/// `period` counts grid ticks, so a daily cycle at a 15 minute cadence is 96.
#[derive(Debug, Clone)]
pub struct SeasonalModel {
    period: usize,
}

/// Fitted seasonal profile
#[derive(Debug, Clone)]
pub struct TrainedSeasonalModel {
    profile: SeasonalProfile,
}

impl SeasonalModel {
    pub fn new(period: usize) -> Result<Self> {
        if period == 0 {
            return Err(ForecastError::InvalidParameter(
                "Seasonal period must be positive".to_string(),
            ));
        }
        Ok(Self { period })
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl ForecastModel for SeasonalModel {
    fn name(&self) -> &str {
        "seasonal_profile"
    }

    /// One full cycle is needed before a profile means anything
    fn min_history(&self) -> usize {
        self.period.max(2)
    }

    fn fit(&self, history: &IndexedSeries) -> Result<Box<dyn FittedModel>> {
        ensure_history(self, history)?;
        let profile = SeasonalProfile::fit(history.values(), self.period)?;
        Ok(Box::new(TrainedSeasonalModel { profile }))
    }
}

impl FittedModel for TrainedSeasonalModel {
    fn predict(&self, indices: &[usize]) -> Result<Vec<f64>> {
        Ok(indices.iter().map(|&i| self.profile.predict(i)).collect())
    }

    fn name(&self) -> &str {
        "seasonal_profile"
    }
}
