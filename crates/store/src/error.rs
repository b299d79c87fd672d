//! Store error types

use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database connection or statement error
    #[error("database error: {0}")]
    Database(#[from] turso::Error),

    /// The database file has not been created yet
    #[error("database not initialized: {path} (run `cohort init` first)")]
    NotInitialized { path: String },

    /// Invalid stored data
    #[error("invalid {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

impl StoreError {
    /// Create a not initialized error
    pub fn not_initialized(path: impl Into<String>) -> Self {
        Self::NotInitialized { path: path.into() }
    }

    /// Create an invalid data error
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;
