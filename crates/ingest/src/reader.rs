//! Chunked CSV source
//!
//! Reads the raw export in bounded-size chunks so large files never have to
//! fit in memory. Each chunk later commits in its own transaction.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use csv::ReaderBuilder;
use tracing::debug;

use crate::error::{IngestError, Result};
use crate::raw::{Headers, RawRow};

/// Chunked reader over a CSV export
#[derive(Debug)]
pub struct CsvSource {
    reader: csv::Reader<File>,
    headers: Arc<Headers>,
}

impl CsvSource {
    /// Open a CSV file, failing when it does not exist
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(IngestError::missing_input(path.display().to_string()));
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)?;

        let headers = Arc::new(Headers::new(reader.headers()?));
        debug!(path = %path.display(), columns = headers.names().len(), "Opened CSV source");

        Ok(Self { reader, headers })
    }

    /// The source's header map
    pub fn headers(&self) -> &Arc<Headers> {
        &self.headers
    }

    /// Read up to `max_rows` records; an empty vec means end of input
    pub fn read_chunk(&mut self, max_rows: usize) -> Result<Vec<RawRow>> {
        let mut rows = Vec::with_capacity(max_rows.min(1024));

        for record in self.reader.records().take(max_rows) {
            let record = record?;
            rows.push(RawRow::new(Arc::clone(&self.headers), record));
        }

        Ok(rows)
    }
}
