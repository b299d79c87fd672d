//! Cohort Ingestion
//!
//! CSV normalization and chunked ingestion into the canonical store.
//!
//! # Overview
//!
//! - **Raw access**: header-addressed rows where missing and empty cells
//!   read the same (`RawRow`)
//! - **Normalization**: timestamps, currency, device category, USD
//!   conversion, product id and params extraction (`Normalizer`)
//! - **Pipeline**: full-refresh chunked ingestion with per-chunk
//!   transactions and cross-chunk purchase dedup (`Pipeline`)
//!
//! # Usage
//!
//! ```ignore
//! use cohort_ingest::{Pipeline, RateTable};
//!
//! let rates = RateTable::new(store.rates().all().await?);
//! let pipeline = Pipeline::new(&store, rates, &config.ingest);
//! let summary = pipeline.run(&config.data.csv_path).await?;
//! println!("{} events", summary.events_inserted);
//! ```

pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod raw;
pub mod reader;

#[cfg(test)]
mod pipeline_test;

// Re-exports for convenience
pub use error::{IngestError, Result};
pub use normalize::{Issue, NormalizedRow, Normalizer, RateTable, RowOutcome, SkipReason};
pub use pipeline::{IngestSummary, Pipeline};
pub use raw::{Headers, RawRow};
pub use reader::CsvSource;
