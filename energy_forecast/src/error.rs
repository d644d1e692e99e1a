//! Error types for the energy_forecast crate

use polars::prelude::PolarsError;
use thiserror::Error;

/// Custom error types for the energy_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// Error related to forecasting operations
    #[error("Forecasting error: {0}")]
    ForecastingError(String),

    /// Error related to configuration or input validation
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Mode name not present in the registry
    #[error("Unknown energy-saving mode '{name}' (known modes: {known})")]
    UnknownMode { name: String, known: String },

    /// Input source lacks required columns
    #[error("Source '{source_name}' is missing required columns: {}", columns.join(", "))]
    MissingColumns {
        source_name: String,
        columns: Vec<String>,
    },

    /// History too short for a model
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Fit or predict exceeded its time budget
    #[error("Timed out after {0} ms")]
    Timeout(u64),

    /// Error from mathematical operations
    #[error("Math error: {0}")]
    MathError(#[from] series_math::MathError),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),

    /// Error from writing result files
    #[error("CSV error: {0}")]
    CsvError(String),

    /// Error from JSON (de)serialization
    #[error("Serialization error: {0}")]
    SerdeError(String),
}

impl ForecastError {
    /// Whether this error must abort the run.
    ///
    /// Everything else is scoped to a single row or (cell, metric, model)
    /// combination and is skipped.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            ForecastError::InsufficientData(_)
                | ForecastError::Timeout(_)
                | ForecastError::ForecastingError(_)
                | ForecastError::MathError(_)
        )
    }
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::PolarsError(err.to_string())
    }
}

impl From<serde_json::Error> for ForecastError {
    fn from(err: serde_json::Error) -> Self {
        ForecastError::SerdeError(err.to_string())
    }
}

impl From<csv::Error> for ForecastError {
    fn from(err: csv::Error) -> Self {
        ForecastError::CsvError(err.to_string())
    }
}
