//! Ingestion configuration
//!
//! Tuning knobs for the CSV ingestion pipeline.

use serde::Deserialize;

/// Ingestion settings
///
/// All fields have sensible defaults - you only need to specify what you
/// want to change.
///
/// # Example
///
/// ```toml
/// [ingest]
/// chunk_size = 20000
/// purchase_event = "af_purchase"
/// default_install_to_event = true
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Rows per ingestion chunk (each chunk commits in its own transaction)
    /// Default: 50000
    pub chunk_size: usize,

    /// Event name that marks a purchase
    /// Default: "af_purchase"
    pub purchase_event: String,

    /// When a row has no install time, fall back to the event time
    /// Default: true
    pub default_install_to_event: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_size: 50_000,
            purchase_event: "af_purchase".into(),
            default_install_to_event: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = IngestConfig::default();
        assert_eq!(config.chunk_size, 50_000);
        assert_eq!(config.purchase_event, "af_purchase");
        assert!(config.default_install_to_event);
    }

    #[test]
    fn test_deserialize_partial() {
        let toml = r#"
chunk_size = 1000
default_install_to_event = false
"#;
        let config: IngestConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.chunk_size, 1000);
        assert!(!config.default_install_to_event);
        // Default still applies
        assert_eq!(config.purchase_event, "af_purchase");
    }
}
