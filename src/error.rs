use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the analysis library.
///
/// Every failure is returned to the immediate caller; nothing in the library
/// retries or substitutes a default value.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("no trading days available to align against")]
    EmptyIndex,

    #[error("insufficient data for correlation: {0}")]
    InsufficientData(InsufficientData),

    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("{file} must contain columns: {}", missing.join(", "))]
    MissingColumns { file: String, missing: Vec<String> },

    #[error("{0}: price file has no rows")]
    NoPriceHistory(String),

    #[error("{file}: column {column} has no values")]
    EmptyColumn { file: String, column: String },

    #[error("invalid date or timestamp: {0:?}")]
    InvalidDate(String),

    #[error("row {row}: invalid number {value:?} in column {column}")]
    InvalidNumber {
        row: usize,
        column: String,
        value: String,
    },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("analysis task failed: {0}")]
    Task(String),
}

/// Why a correlation could not be computed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InsufficientData {
    #[error("need at least 2 joined observations, found {found}")]
    TooFewPairs { found: usize },

    #[error("{series} series has zero variance over {pairs} joined observations")]
    ZeroVariance { series: &'static str, pairs: usize },
}

impl From<InsufficientData> for AnalysisError {
    fn from(reason: InsufficientData) -> Self {
        AnalysisError::InsufficientData(reason)
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
