//! Data location configuration
//!
//! Paths to the input CSV and the backing database file.

use std::path::PathBuf;

use serde::Deserialize;

/// Data file locations
///
/// # Example
///
/// ```toml
/// [data]
/// csv_path = "data/events.csv"
/// db_path = "data/app.db"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Path to the raw attribution export (CSV)
    /// Default: "data/events.csv"
    pub csv_path: PathBuf,

    /// Path to the SQLite database file
    /// Default: "data/app.db"
    pub db_path: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from("data/events.csv"),
            db_path: PathBuf::from("data/app.db"),
        }
    }
}
