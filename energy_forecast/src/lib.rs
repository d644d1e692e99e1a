//! # Energy Forecast
//!
//! Forecast per-cell load metrics of a radio network and find the future
//! periods in which a cell could run an energy-saving mode.
//!
//! ## Features
//!
//! - Alignment of two raw metric sources onto a fixed time grid
//! - Pluggable per-cell forecasting models (linear trend, Holt, moving average, seasonal profile)
//! - Energy-saving mode registry with per-metric threshold ranges
//! - Extraction of contiguous qualifying windows of a minimum duration
//! - CSV and JSON result files plus a text timeline
//!
//! ## Pipeline
//!
//! 1. [`data::DataAligner`] inner-joins both sources on cell, site and
//!    timestamp, rounds to the grid and averages duplicates.
//! 2. [`engine::ForecastEngine`] fits every model to every (cell, metric)
//!    history, indexed by position, and predicts the horizon.
//! 3. [`filter::ThresholdFilter`] keeps forecast rows inside every range of
//!    the selected [`modes::EnergySavingMode`].
//! 4. [`windows::WindowExtractor`] groups consecutive ticks per cell and
//!    keeps the groups that last long enough.
//!
//! ## Quick Start
//!
//! ```no_run
//! use energy_forecast::config::RunConfig;
//! use energy_forecast::modes::EnergySavingMode;
//! use energy_forecast::pipeline::Pipeline;
//!
//! # fn main() -> energy_forecast::Result<()> {
//! let config = RunConfig {
//!     mode: EnergySavingMode::CarrierShutdown,
//!     min_window_minutes: 60,
//!     ..RunConfig::default()
//! };
//!
//! let result = Pipeline::new(config)?.run_files("load.csv", "users.csv", "output")?;
//! println!("{}", result.summary);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod filter;
pub mod grid;
pub mod metrics;
pub mod models;
pub mod modes;
pub mod output;
pub mod pipeline;
pub mod report;
pub mod utils;
pub mod windows;

// Re-export commonly used types
pub use crate::config::RunConfig;
pub use crate::data::{AlignedTable, DataAligner, DataLoader, MetricRow, RawSource};
pub use crate::engine::{ForecastEngine, ForecastOutcome, ForecastTable};
pub use crate::error::{ForecastError, Result};
pub use crate::filter::ThresholdFilter;
pub use crate::grid::GridCadence;
pub use crate::models::{FittedModel, ForecastModel, ModelKind};
pub use crate::modes::EnergySavingMode;
pub use crate::pipeline::{Pipeline, PipelineResult};
pub use crate::windows::{Window, WindowExtractor};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
