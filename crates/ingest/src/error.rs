//! Ingestion error types

use thiserror::Error;

/// Ingestion errors
#[derive(Debug, Error)]
pub enum IngestError {
    /// Input file does not exist
    #[error("input file not found: {path}")]
    MissingInput { path: String },

    /// CSV reading failed
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Store operation failed
    #[error(transparent)]
    Store(#[from] cohort_store::StoreError),

    /// Raw database statement failed (transaction control)
    #[error("database error: {0}")]
    Database(#[from] turso::Error),
}

impl IngestError {
    /// Create a missing input error
    pub fn missing_input(path: impl Into<String>) -> Self {
        Self::MissingInput { path: path.into() }
    }
}

/// Result type for ingestion operations
pub type Result<T> = std::result::Result<T, IngestError>;
