//! Raw row access
//!
//! A raw row is a header-addressed view over one CSV record. Missing
//! columns, empty cells and whitespace-only cells all read as absent, which
//! is what lets downstream normalization degrade gracefully on partial
//! exports.

use std::collections::HashMap;
use std::sync::Arc;

use csv::StringRecord;

/// Shared header map for a CSV source
#[derive(Debug)]
pub struct Headers {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl Headers {
    /// Build a header map from the CSV header record
    ///
    /// When the same column name appears twice, the first occurrence wins.
    pub fn new(record: &StringRecord) -> Self {
        let names: Vec<String> = record.iter().map(|s| s.trim().to_string()).collect();

        let mut index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            index.entry(name.clone()).or_insert(i);
        }

        Self { names, index }
    }

    /// Position of a column, if present
    pub fn position(&self, column: &str) -> Option<usize> {
        self.index.get(column).copied()
    }

    /// Column names in file order
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// One raw input row
#[derive(Debug, Clone)]
pub struct RawRow {
    headers: Arc<Headers>,
    record: StringRecord,
}

impl RawRow {
    /// Wrap a CSV record with its header map
    pub fn new(headers: Arc<Headers>, record: StringRecord) -> Self {
        Self { headers, record }
    }

    /// Build a row from column/value pairs (convenient in tests)
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        let header_record: StringRecord = pairs.iter().map(|(k, _)| *k).collect();
        let record: StringRecord = pairs.iter().map(|(_, v)| *v).collect();
        Self {
            headers: Arc::new(Headers::new(&header_record)),
            record,
        }
    }

    /// Get a column value; absent, empty and whitespace-only cells are `None`
    pub fn get(&self, column: &str) -> Option<&str> {
        let pos = self.headers.position(column)?;
        let value = self.record.get(pos)?.trim();
        if value.is_empty() { None } else { Some(value) }
    }

    /// Iterate over (column, value) pairs with non-empty values
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.headers
            .names()
            .iter()
            .zip(self.record.iter())
            .filter_map(|(name, value)| {
                let value = value.trim();
                if value.is_empty() {
                    None
                } else {
                    Some((name.as_str(), value))
                }
            })
    }
}
