use polars::error::PolarsError;
use std::io::Error as IoError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] IoError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Invalid season label: {0:?}")]
    InvalidSeason(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Unsupported table format: {0}")]
    UnsupportedFormat(String),

    #[error("Shape mismatch: {0}")]
    Shape(String),

    #[error("Ridge solve failed: {0}")]
    Solver(String),
}
