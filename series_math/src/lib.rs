//! # Series Math
//!
//! Numeric building blocks for forecasting evenly sampled metric series.
//! Every model in this crate uses the zero-based position of a sample as its
//! only regressor, never a calendar timestamp. Position `n` is the first
//! step after a history of length `n`.
//!
//! - [`regression`]: ordinary least squares on `(position, value)` pairs
//! - [`smoothing`]: Holt double exponential smoothing and trailing means
//! - [`seasonal`]: trend plus repeating per-slot profile
//! - [`stats`]: mean, sums of squares and the coefficient of determination

use thiserror::Error;

pub mod regression;
pub mod seasonal;
pub mod smoothing;
pub mod stats;

pub use regression::LinearRegression;
pub use seasonal::SeasonalProfile;
pub use smoothing::{trailing_mean, HoltSmoothing};
pub use stats::{mean, r_squared};

/// Errors that can occur in series calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for series math operations
pub type Result<T> = std::result::Result<T, MathError>;
