//! End-to-end run: align, forecast, filter, extract and write

use crate::config::RunConfig;
use crate::data::{AlignedTable, DataAligner, DataLoader, MetricRow, RawSource};
use crate::engine::{ForecastEngine, ForecastOutcome};
use crate::error::{ForecastError, Result};
use crate::filter::ThresholdFilter;
use crate::metrics::summarize_fit_quality;
use crate::output::ResultWriter;
use crate::report::RunSummary;
use crate::windows::{Window, WindowExtractor};
use chrono::{DateTime, Utc};
use std::path::Path;
use tracing::{info, warn};

/// Everything a run produced
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub aligned: AlignedTable,
    pub outcome: ForecastOutcome,
    /// Window-model forecast rows that satisfy the mode
    pub qualifying: Vec<MetricRow>,
    pub windows: Vec<Window>,
    pub summary: RunSummary,
}

/// Drives one configured run over two raw sources
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: RunConfig,
    run_start: DateTime<Utc>,
}

impl Pipeline {
    pub fn new(config: RunConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            run_start: Utc::now(),
        })
    }

    /// Fix the instant used by the run-start forecast anchor
    pub fn with_run_start(mut self, run_start: DateTime<Utc>) -> Self {
        self.run_start = run_start;
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Load both CSV files, run, and write every result file to `output_dir`
    pub fn run_files<P: AsRef<Path>>(&self, left: P, right: P, output_dir: P) -> Result<PipelineResult> {
        let left = DataLoader::from_csv(left, &self.config.columns)?;
        let right = DataLoader::from_csv(right, &self.config.columns)?;
        let mut result = self.run(&left, &right)?;

        let writer = ResultWriter::new(output_dir, self.config.columns.clone())?;
        let mut written = Vec::new();
        for table in result.outcome.tables.values() {
            written.push(writer.write_forecast(table)?);
        }
        if let Some(path) = writer.write_windows(self.config.mode, &result.windows)? {
            written.push(path);
        }
        written.push(writer.output_dir().join("run_summary.json"));
        result.summary.written = written;
        writer.write_summary(&result.summary)?;

        Ok(result)
    }

    /// Run on in-memory sources without touching the filesystem
    pub fn run(&self, left: &RawSource, right: &RawSource) -> Result<PipelineResult> {
        match self.config.worker_threads {
            Some(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|e| ForecastError::InvalidParameter(format!("Worker pool: {}", e)))?;
                pool.install(|| self.compute(left, right))
            }
            None => self.compute(left, right),
        }
    }

    #[tracing::instrument(skip_all, fields(mode = %self.config.mode))]
    fn compute(&self, left: &RawSource, right: &RawSource) -> Result<PipelineResult> {
        let config = &self.config;
        let cadence = config.cadence;

        let (aligned, alignment) = DataAligner::new(cadence).align(left, right)?;
        if aligned.is_empty() {
            warn!("no rows survived alignment");
        }

        let engine = ForecastEngine::new(config.build_models()?, cadence, config.horizon_months)
            .with_anchor(config.anchor)
            .with_timeout(config.fit_timeout())
            .with_run_start(self.run_start);
        let outcome = engine.forecast(&aligned)?;

        let window_model = config.window_model_name().to_string();
        let forecast_rows = outcome
            .table(&window_model)
            .map(|table| table.to_wide())
            .unwrap_or_default();

        let qualifying = ThresholdFilter::new(config.mode).apply(&forecast_rows);
        if qualifying.is_empty() {
            info!(model = %window_model, "no forecast rows satisfy the mode thresholds");
        }

        let windows = WindowExtractor::new(cadence, config.min_window())?.extract(&qualifying);
        if windows.is_empty() {
            info!("no qualifying energy-saving windows");
        }

        let summary = RunSummary {
            mode: config.mode,
            cadence_minutes: cadence.minutes(),
            min_window_minutes: config.min_window_minutes,
            horizon_months: config.horizon_months,
            window_model,
            alignment,
            model_scores: summarize_fit_quality(&outcome.fit_quality),
            forecast_rows: outcome
                .tables
                .iter()
                .map(|(name, table)| (name.clone(), table.len()))
                .collect(),
            skipped: outcome.skipped.clone(),
            qualifying_rows: qualifying.len(),
            windows: windows.len(),
            rows_in_windows: windows.iter().map(Window::len).sum(),
            written: Vec::new(),
        };
        info!(windows = summary.windows, skipped = summary.skipped.len(), "run complete");

        Ok(PipelineResult {
            aligned,
            outcome,
            qualifying,
            windows,
            summary,
        })
    }
}
