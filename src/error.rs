use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClimaError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Forecast unavailable: {0}")]
    ForecastUnavailable(String),

    #[error("Forecast request timed out after {}s", .0.as_secs_f64())]
    ForecastTimeout(Duration),

    #[error("Forecast series is empty")]
    EmptySeries,

    #[error("Export failed: {0}")]
    ExportFailure(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ClimaError>;
