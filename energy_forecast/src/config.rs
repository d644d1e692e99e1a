//! Run configuration

use crate::data::ColumnNames;
use crate::engine::ForecastAnchor;
use crate::error::{ForecastError, Result};
use crate::grid::{GridCadence, MAX_MINUTES};
use crate::models::{ForecastModel, ModelKind};
use crate::modes::EnergySavingMode;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration as StdDuration;

/// Everything that can be set before a run.
///
/// Missing JSON fields take their default value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Energy-saving mode whose thresholds select rows
    pub mode: EnergySavingMode,
    /// Shortest window worth reporting, in minutes
    pub min_window_minutes: i64,
    /// Forecast horizon in calendar months
    pub horizon_months: u32,
    /// Grid cadence in minutes
    #[serde(rename = "cadence_minutes")]
    pub cadence: GridCadence,
    /// Render a text timeline of the windows after the run
    pub visualize: bool,
    /// Time budget per (cell, metric, model) fit; `None` disables it
    pub fit_timeout_ms: Option<u64>,
    /// Models to run, each producing its own forecast table
    pub models: Vec<ModelKind>,
    /// Model whose forecast feeds the threshold filter; first model if unset
    pub window_model: Option<String>,
    pub anchor: ForecastAnchor,
    pub columns: ColumnNames,
    /// Rayon pool size; rayon's default when unset
    pub worker_threads: Option<usize>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            mode: EnergySavingMode::default(),
            min_window_minutes: 60,
            horizon_months: 6,
            cadence: GridCadence::default(),
            visualize: false,
            fit_timeout_ms: Some(30_000),
            models: ModelKind::defaults(),
            window_model: None,
            anchor: ForecastAnchor::default(),
            columns: ColumnNames::default(),
            worker_threads: None,
        }
    }
}

impl RunConfig {
    /// Load and validate a JSON configuration file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: RunConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_window_minutes <= 0 || self.min_window_minutes > MAX_MINUTES {
            return Err(ForecastError::ValidationError(format!(
                "Minimum window must be between 1 and {} minutes, got {}",
                MAX_MINUTES, self.min_window_minutes
            )));
        }
        if self.horizon_months == 0 {
            return Err(ForecastError::ValidationError(
                "Forecast horizon must be at least one month".to_string(),
            ));
        }
        if self.models.is_empty() {
            return Err(ForecastError::ValidationError(
                "At least one forecasting model is required".to_string(),
            ));
        }

        let mut names = BTreeSet::new();
        for model in &self.models {
            if !names.insert(model.name()) {
                return Err(ForecastError::ValidationError(format!(
                    "Model '{}' is configured more than once",
                    model.name()
                )));
            }
        }
        if let Some(window_model) = &self.window_model {
            if !names.contains(window_model.as_str()) {
                return Err(ForecastError::ValidationError(format!(
                    "Window model '{}' is not among the configured models",
                    window_model
                )));
            }
        }

        if self.fit_timeout_ms == Some(0) {
            return Err(ForecastError::ValidationError(
                "Fit timeout must be positive; omit it to disable".to_string(),
            ));
        }
        if self.worker_threads == Some(0) {
            return Err(ForecastError::ValidationError(
                "Worker thread count must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn min_window(&self) -> Duration {
        Duration::minutes(self.min_window_minutes)
    }

    pub fn fit_timeout(&self) -> Option<StdDuration> {
        self.fit_timeout_ms.map(StdDuration::from_millis)
    }

    /// Name of the model whose forecast is filtered into windows
    pub fn window_model_name(&self) -> &str {
        match &self.window_model {
            Some(name) => name.as_str(),
            None => self.models.first().map(ModelKind::name).unwrap_or_default(),
        }
    }

    pub fn build_models(&self) -> Result<Vec<Arc<dyn ForecastModel>>> {
        self.models.iter().map(ModelKind::build).collect()
    }
}
