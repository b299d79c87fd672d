//! Cohort Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! Minimal config should just work - only specify what you need to change.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use cohort_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[ingest]\nchunk_size = 1000").unwrap();
//! ```
//!
//! # Example Minimal Config
//!
//! ```toml
//! [data]
//! csv_path = "exports/march.csv"
//! db_path = "data/app.db"
//! ```

mod data;
mod error;
mod ingest;
mod logging;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use data::DataConfig;
pub use error::{ConfigError, Result};
pub use ingest::IngestConfig;
pub use logging::{LogConfig, LogLevel};

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Data file locations (input CSV, database file)
    pub data: DataConfig,

    /// Ingestion tuning (chunk size, purchase event name, install fallback)
    pub ingest: IngestConfig,

    /// Logging configuration
    pub log: LogConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or contains invalid TOML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    ///
    /// Prefer using the `FromStr` trait implementation.
    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.ingest.chunk_size == 0 {
            return Err(ConfigError::invalid_value(
                "ingest",
                "chunk_size",
                "must be greater than zero",
            ));
        }

        if self.ingest.purchase_event.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "ingest",
                "purchase_event",
                "must not be empty",
            ));
        }

        Ok(())
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config.ingest.chunk_size, 50_000);
        assert_eq!(config.ingest.purchase_event, "af_purchase");
        assert_eq!(config.log.level, LogLevel::Info);
    }

    #[test]
    fn test_minimal_config() {
        let toml = r#"
[data]
csv_path = "exports/march.csv"
"#;
        let config = Config::from_str(toml).unwrap();
        assert_eq!(
            config.data.csv_path,
            std::path::PathBuf::from("exports/march.csv")
        );
        // Everything else keeps defaults
        assert_eq!(config.ingest.chunk_size, 50_000);
    }

    #[test]
    fn test_full_config() {
        let toml = r#"
[data]
csv_path = "in.csv"
db_path = "out.db"

[ingest]
chunk_size = 500
purchase_event = "purchase"
default_install_to_event = false

[log]
level = "debug"
"#;
        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.ingest.chunk_size, 500);
        assert_eq!(config.ingest.purchase_event, "purchase");
        assert!(!config.ingest.default_install_to_event);
        assert_eq!(config.log.level, LogLevel::Debug);
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let err = Config::from_str("[ingest]\nchunk_size = 0").unwrap_err();
        assert!(err.to_string().contains("chunk_size"));
    }

    #[test]
    fn test_empty_purchase_event_rejected() {
        let err = Config::from_str("[ingest]\npurchase_event = \" \"").unwrap_err();
        assert!(err.to_string().contains("purchase_event"));
    }

    #[test]
    fn test_invalid_toml_rejected() {
        assert!(Config::from_str("[data\ncsv_path = ").is_err());
    }
}
