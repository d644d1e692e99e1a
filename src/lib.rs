//! # Cell Energy
//!
//! Workspace facade over the two crates that find energy-saving windows in
//! forecast cell load.
//!
//! - [`series_math`]: index-based regression, smoothing and fit quality
//! - [`energy_forecast`]: alignment, forecasting, thresholds, windows and the CLI
//!
//! ## Example
//!
//! ```
//! use cell_energy_workspace::energy_forecast::EnergySavingMode;
//!
//! let mode: EnergySavingMode = "deep_sleep".parse().unwrap();
//! assert_eq!(mode.ranges().len(), 2);
//! ```

pub use energy_forecast;
pub use series_math;
