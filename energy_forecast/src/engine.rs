//! Per-cell forecasting across every configured model

use crate::data::{AlignedTable, MetricRow};
use crate::error::{ForecastError, Result};
use crate::grid::GridCadence;
use crate::metrics::FitQuality;
use crate::models::{score, ForecastModel, IndexedSeries};
use crate::utils::future_timestamps;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration as StdDuration;
use tracing::{debug, info, warn};

/// One predicted value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastRow {
    pub entity_id: String,
    pub timestamp: DateTime<Utc>,
    pub metric_name: String,
    pub predicted_value: f64,
}

/// Forecast of one model for every cell and metric it could fit
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastTable {
    model_name: String,
    /// Sorted by cell, then timestamp, then metric
    rows: Vec<ForecastRow>,
}

impl ForecastTable {
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn rows(&self) -> &[ForecastRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Predicted values of one (cell, metric) in time order
    pub fn series(&self, entity_id: &str, metric: &str) -> Vec<&ForecastRow> {
        self.rows
            .iter()
            .filter(|row| row.entity_id == entity_id && row.metric_name == metric)
            .collect()
    }

    /// Pivot to one row per (cell, timestamp) with a column per metric
    pub fn to_wide(&self) -> Vec<MetricRow> {
        let mut wide: BTreeMap<(&str, DateTime<Utc>), MetricRow> = BTreeMap::new();
        for row in &self.rows {
            wide.entry((row.entity_id.as_str(), row.timestamp))
                .or_insert_with(|| MetricRow::new(&row.entity_id, row.timestamp))
                .values
                .insert(row.metric_name.clone(), row.predicted_value);
        }
        wide.into_values().collect()
    }
}

/// Where each cell's forecast horizon begins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastAnchor {
    /// One cadence after the cell's last aligned timestamp
    #[default]
    LastObserved,
    /// One cadence after the run's start instant, floored to the grid
    RunStart,
}

/// A (cell, metric, model) combination that produced no forecast
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedCombination {
    pub entity_id: String,
    pub metric_name: String,
    pub model_name: String,
    pub reason: String,
}

/// Everything the engine produced in one run
#[derive(Debug, Clone, Default)]
pub struct ForecastOutcome {
    /// Forecast tables keyed by model name
    pub tables: BTreeMap<String, ForecastTable>,
    pub fit_quality: Vec<FitQuality>,
    pub skipped: Vec<SkippedCombination>,
}

impl ForecastOutcome {
    pub fn table(&self, model_name: &str) -> Option<&ForecastTable> {
        self.tables.get(model_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct CombinationKey {
    model_name: String,
    entity_id: String,
    metric_name: String,
}

/// Collects per-combination results and merges them once at the end
#[derive(Debug, Default)]
pub struct ForecastBuilder {
    forecasts: BTreeMap<CombinationKey, (Vec<DateTime<Utc>>, Vec<f64>, f64)>,
    skipped: BTreeMap<CombinationKey, String>,
    models: Vec<String>,
}

impl ForecastBuilder {
    pub fn new(model_names: Vec<String>) -> Self {
        Self {
            models: model_names,
            ..Self::default()
        }
    }

    /// Record a successful forecast; timestamps and values must pair up
    pub fn record_forecast(
        &mut self,
        entity_id: &str,
        metric_name: &str,
        model_name: &str,
        timestamps: Vec<DateTime<Utc>>,
        values: Vec<f64>,
        r_squared: f64,
    ) {
        let key = Self::key(entity_id, metric_name, model_name);
        self.forecasts.insert(key, (timestamps, values, r_squared));
    }

    pub fn record_skip(&mut self, entity_id: &str, metric_name: &str, model_name: &str, reason: String) {
        self.skipped
            .insert(Self::key(entity_id, metric_name, model_name), reason);
    }

    fn key(entity_id: &str, metric_name: &str, model_name: &str) -> CombinationKey {
        CombinationKey {
            model_name: model_name.to_string(),
            entity_id: entity_id.to_string(),
            metric_name: metric_name.to_string(),
        }
    }

    /// Merge into per-model tables. Every configured model gets a table,
    /// possibly empty.
    pub fn build(self) -> ForecastOutcome {
        let mut rows_by_model: BTreeMap<String, Vec<ForecastRow>> = self
            .models
            .iter()
            .map(|name| (name.clone(), Vec::new()))
            .collect();
        let mut fit_quality = Vec::with_capacity(self.forecasts.len());

        for (key, (timestamps, values, r_squared)) in self.forecasts {
            let rows = rows_by_model.entry(key.model_name.clone()).or_default();
            rows.extend(timestamps.into_iter().zip(values).map(|(timestamp, value)| {
                ForecastRow {
                    entity_id: key.entity_id.clone(),
                    timestamp,
                    metric_name: key.metric_name.clone(),
                    predicted_value: value,
                }
            }));
            fit_quality.push(FitQuality {
                entity_id: key.entity_id,
                metric_name: key.metric_name,
                model_name: key.model_name,
                r_squared,
            });
        }

        let tables = rows_by_model
            .into_iter()
            .map(|(model_name, mut rows)| {
                rows.sort_by(|a, b| {
                    (&a.entity_id, a.timestamp, &a.metric_name).cmp(&(
                        &b.entity_id,
                        b.timestamp,
                        &b.metric_name,
                    ))
                });
                (model_name.clone(), ForecastTable { model_name, rows })
            })
            .collect();

        let skipped = self
            .skipped
            .into_iter()
            .map(|(key, reason)| SkippedCombination {
                entity_id: key.entity_id,
                metric_name: key.metric_name,
                model_name: key.model_name,
                reason,
            })
            .collect();

        ForecastOutcome {
            tables,
            fit_quality,
            skipped,
        }
    }
}

struct Job {
    entity_id: String,
    metric_name: String,
    model: Arc<dyn ForecastModel>,
    history: IndexedSeries,
    timestamps: Vec<DateTime<Utc>>,
}

/// Fits every model to every (cell, metric) history and predicts the horizon
#[derive(Debug, Clone)]
pub struct ForecastEngine {
    models: Vec<Arc<dyn ForecastModel>>,
    cadence: GridCadence,
    horizon_months: u32,
    anchor: ForecastAnchor,
    fit_timeout: Option<StdDuration>,
    run_start: DateTime<Utc>,
}

impl ForecastEngine {
    pub fn new(models: Vec<Arc<dyn ForecastModel>>, cadence: GridCadence, horizon_months: u32) -> Self {
        Self {
            models,
            cadence,
            horizon_months,
            anchor: ForecastAnchor::default(),
            fit_timeout: None,
            run_start: Utc::now(),
        }
    }

    pub fn with_anchor(mut self, anchor: ForecastAnchor) -> Self {
        self.anchor = anchor;
        self
    }

    /// Bound each fit + predict; expiry skips the combination.
    ///
    /// Each bounded job runs on its own thread. A fit that times out keeps
    /// running in the background until it returns; its result is dropped.
    pub fn with_timeout(mut self, timeout: Option<StdDuration>) -> Self {
        self.fit_timeout = timeout;
        self
    }

    pub fn with_run_start(mut self, run_start: DateTime<Utc>) -> Self {
        self.run_start = run_start;
        self
    }

    pub fn model_names(&self) -> Vec<String> {
        self.models.iter().map(|m| m.name().to_string()).collect()
    }

    /// Future timestamps of one (cell, metric): H ticks after its anchor.
    ///
    /// The last-observed anchor is the last row carrying `metric`, so the
    /// first timestamp always pairs with history index `n`.
    pub fn horizon_timestamps(
        &self,
        table: &AlignedTable,
        entity_id: &str,
        metric: &str,
    ) -> Result<Vec<DateTime<Utc>>> {
        let anchor = match self.anchor {
            ForecastAnchor::LastObserved => table.last_observed(entity_id, metric).ok_or_else(|| {
                ForecastError::InsufficientData(format!(
                    "Cell '{}' has no observed '{}' values",
                    entity_id, metric
                ))
            })?,
            ForecastAnchor::RunStart => self.cadence.floor(self.run_start),
        };
        let ticks = self.cadence.horizon_ticks(anchor, self.horizon_months)?;
        Ok(future_timestamps(anchor, ticks, self.cadence))
    }

    /// Forecast every (cell, metric, model) combination.
    ///
    /// Failures of a single combination are recorded as skips; only an
    /// invalid horizon aborts.
    #[tracing::instrument(skip_all, fields(models = self.models.len(), horizon_months = self.horizon_months))]
    pub fn forecast(&self, table: &AlignedTable) -> Result<ForecastOutcome> {
        let mut builder = ForecastBuilder::new(self.model_names());
        let mut jobs = Vec::new();

        for entity_id in table.entities() {
            for metric in table.metric_names() {
                let timestamps = match self.horizon_timestamps(table, entity_id, metric) {
                    Ok(ts) => ts,
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        for model in &self.models {
                            builder.record_skip(entity_id, metric, model.name(), e.to_string());
                        }
                        continue;
                    }
                };

                let history = IndexedSeries::from_values(table.history(entity_id, metric));
                for model in &self.models {
                    jobs.push(Job {
                        entity_id: entity_id.to_string(),
                        metric_name: metric.clone(),
                        model: Arc::clone(model),
                        history: history.clone(),
                        timestamps: timestamps.clone(),
                    });
                }
            }
        }

        info!(combinations = jobs.len(), "forecasting");
        let timeout = self.fit_timeout;
        let results: Vec<(Job, Result<(Vec<f64>, f64)>)> = jobs
            .into_par_iter()
            .map(|job| {
                let result = run_bounded(
                    Arc::clone(&job.model),
                    job.history.clone(),
                    job.timestamps.len(),
                    timeout,
                );
                (job, result)
            })
            .collect();

        for (job, result) in results {
            let model_name = job.model.name();
            match result {
                Ok((values, r_squared)) => {
                    debug!(cell = %job.entity_id, metric = %job.metric_name, model = model_name, r_squared, "fitted");
                    builder.record_forecast(
                        &job.entity_id,
                        &job.metric_name,
                        model_name,
                        job.timestamps,
                        values,
                        r_squared,
                    );
                }
                Err(e) => {
                    warn!(cell = %job.entity_id, metric = %job.metric_name, model = model_name, error = %e, "skipping combination");
                    builder.record_skip(&job.entity_id, &job.metric_name, model_name, e.to_string());
                }
            }
        }

        let outcome = builder.build();
        info!(
            fitted = outcome.fit_quality.len(),
            skipped = outcome.skipped.len(),
            "forecasting complete"
        );
        Ok(outcome)
    }
}

/// Fit, predict the horizon and score; on a helper thread when bounded
fn run_bounded(
    model: Arc<dyn ForecastModel>,
    history: IndexedSeries,
    horizon: usize,
    timeout: Option<StdDuration>,
) -> Result<(Vec<f64>, f64)> {
    let work = move || -> Result<(Vec<f64>, f64)> {
        let fitted = model.fit(&history)?;
        let values = fitted.predict(&history.future_indices(horizon))?;
        if values.len() != horizon {
            return Err(ForecastError::ForecastingError(format!(
                "{} returned {} values for {} indices",
                fitted.name(),
                values.len(),
                horizon
            )));
        }
        let r_squared = score(fitted.as_ref(), &history)?;
        Ok((values, r_squared))
    };

    let Some(limit) = timeout else {
        return work();
    };

    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("forecast-fit".to_string())
        .spawn(move || {
            // The receiver is gone if we already timed out
            let _ = tx.send(work());
        })
        .map_err(|e| ForecastError::ForecastingError(format!("Cannot spawn fit worker: {}", e)))?;

    match rx.recv_timeout(limit) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => Err(ForecastError::Timeout(limit.as_millis() as u64)),
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(ForecastError::ForecastingError(
            "Fit worker stopped without a result".to_string(),
        )),
    }
}
