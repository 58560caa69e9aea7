use thiserror::Error;

use crate::charts::ChartError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("File processing error: {0}")]
    FileProcessingError(String),
    #[error("DataFrame error: {0}")]
    DataFrameError(String),
    #[error("Chart error: {0}")]
    Chart(#[from] ChartError),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::ParseError(err.to_string())
    }
}

impl From<calamine::XlsxError> for AppError {
    fn from(err: calamine::XlsxError) -> Self {
        AppError::FileProcessingError(err.to_string())
    }
}

impl From<polars::prelude::PolarsError> for AppError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        AppError::DataFrameError(err.to_string())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("Background task failed: {}", err))
    }
}
