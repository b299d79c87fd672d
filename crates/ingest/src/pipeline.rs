//! Chunked ingestion pipeline
//!
//! Drives the full refresh of the canonical collections: clear, then for
//! each chunk normalize and write users, events and deduplicated purchases
//! inside one transaction. Duplicate detection consults the store through
//! the ingesting connection, so decisions are consistent across chunk
//! boundaries.

use std::path::Path;

use tracing::{debug, info};
use turso::Connection;

use cohort_config::IngestConfig;
use cohort_store::{fmt_datetime, Store};

use crate::error::Result;
use crate::normalize::{NormalizedRow, Normalizer, RateTable, RowOutcome, SkipReason};
use crate::raw::RawRow;
use crate::reader::CsvSource;

/// Counters describing one ingestion run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestSummary {
    /// Data rows read from the CSV
    pub rows_read: u64,
    /// Rows dropped for missing user id
    pub rows_skipped_no_user: u64,
    /// Rows dropped for an event time no format could parse
    pub rows_skipped_bad_time: u64,
    /// Usable rows that carried at least one field issue
    pub rows_with_issues: u64,
    /// Users created (first-observed rows)
    pub users_created: u64,
    /// Events inserted
    pub events_inserted: u64,
    /// Purchases inserted after dedup
    pub purchases_inserted: u64,
    /// Purchase rows suppressed as duplicates
    pub purchases_duplicate: u64,
    /// Chunks committed
    pub chunks: u64,
}

/// Chunked CSV-to-store ingestion
pub struct Pipeline<'a> {
    store: &'a Store,
    normalizer: Normalizer,
    chunk_size: usize,
    purchase_event: String,
}

impl<'a> Pipeline<'a> {
    /// Create a pipeline over a store with the given rate table and settings
    pub fn new(store: &'a Store, rates: RateTable, config: &IngestConfig) -> Self {
        Self {
            store,
            normalizer: Normalizer::new(rates, config.default_install_to_event),
            chunk_size: config.chunk_size,
            purchase_event: config.purchase_event.clone(),
        }
    }

    /// Run a full refresh from the CSV at `csv_path`
    ///
    /// The clear of the previous run's rows rides in the first chunk's
    /// transaction, so a single-batch ingestion replaces the collections
    /// atomically and a failure there leaves the prior data intact.
    pub async fn run(&self, csv_path: &Path) -> Result<IngestSummary> {
        let mut source = CsvSource::open(csv_path)?;
        let conn = self.store.connect()?;

        info!(path = %csv_path.display(), "Starting ingestion");

        let mut summary = IngestSummary::default();
        let mut cleared = false;

        loop {
            let rows = source.read_chunk(self.chunk_size)?;
            if rows.is_empty() {
                break;
            }

            let normalized = self.normalize_chunk(&rows, &mut summary);

            conn.execute("BEGIN", ()).await?;
            let written = async {
                if !cleared {
                    self.clear_collections(&conn).await?;
                }
                self.write_chunk(&conn, &normalized, &mut summary).await
            }
            .await;
            match written {
                Ok(()) => {
                    conn.execute("COMMIT", ()).await?;
                    cleared = true;
                }
                Err(e) => {
                    let _ = conn.execute("ROLLBACK", ()).await;
                    return Err(e);
                }
            }

            summary.chunks += 1;
            debug!(
                chunk = summary.chunks,
                rows = rows.len(),
                "Committed ingestion chunk"
            );
        }

        // An empty export still refreshes: clear whatever the last run left
        if !cleared {
            conn.execute("BEGIN", ()).await?;
            match self.clear_collections(&conn).await {
                Ok(()) => {
                    conn.execute("COMMIT", ()).await?;
                }
                Err(e) => {
                    let _ = conn.execute("ROLLBACK", ()).await;
                    return Err(e);
                }
            }
        }

        info!(
            rows = summary.rows_read,
            skipped_no_user = summary.rows_skipped_no_user,
            skipped_bad_time = summary.rows_skipped_bad_time,
            with_issues = summary.rows_with_issues,
            users = summary.users_created,
            events = summary.events_inserted,
            purchases = summary.purchases_inserted,
            duplicates = summary.purchases_duplicate,
            "Ingestion complete"
        );

        Ok(summary)
    }

    /// Delete all users/events/purchases rows (inside the caller's transaction)
    async fn clear_collections(&self, conn: &Connection) -> Result<()> {
        self.store.events().clear(conn).await?;
        self.store.purchases().clear(conn).await?;
        self.store.users().clear(conn).await?;
        debug!("Cleared canonical collections");
        Ok(())
    }

    fn normalize_chunk(&self, rows: &[RawRow], summary: &mut IngestSummary) -> Vec<NormalizedRow> {
        let mut normalized = Vec::with_capacity(rows.len());

        for raw in rows {
            summary.rows_read += 1;

            match self.normalizer.normalize(raw) {
                RowOutcome::Usable(row) => {
                    if !row.issues.is_empty() {
                        summary.rows_with_issues += 1;
                        for issue in &row.issues {
                            debug!(column = issue.column, reason = %issue.reason, "Field defaulted");
                        }
                    }
                    normalized.push(*row);
                }
                RowOutcome::Skipped(SkipReason::MissingUserId) => {
                    summary.rows_skipped_no_user += 1;
                }
                RowOutcome::Skipped(SkipReason::UnparseableEventTime(value)) => {
                    summary.rows_skipped_bad_time += 1;
                    debug!(value = %value, "Dropped row with unparseable event time");
                }
            }
        }

        normalized
    }

    /// Write one chunk: users first, then events, then deduplicated purchases
    ///
    /// Ordering guarantees a users row exists before any purchase that
    /// references it.
    async fn write_chunk(
        &self,
        conn: &Connection,
        rows: &[NormalizedRow],
        summary: &mut IngestSummary,
    ) -> Result<()> {
        let users = self.store.users();
        let events = self.store.events();
        let purchases = self.store.purchases();

        for row in rows {
            if users.exists(conn, &row.user_id).await? {
                users
                    .extend_last_seen(conn, &row.user_id, row.event_date)
                    .await?;
            } else {
                users.insert(conn, &row.to_user()).await?;
                summary.users_created += 1;
            }

            events.insert(conn, &row.to_event()).await?;
            summary.events_inserted += 1;

            if row.event_name == self.purchase_event && row.revenue_usd > 0.0 {
                let purchase_time = fmt_datetime(row.event_time);
                let order_id = row.order_id.as_deref().unwrap_or("");

                if purchases
                    .exists_key(conn, &row.user_id, order_id, &purchase_time)
                    .await?
                {
                    summary.purchases_duplicate += 1;
                } else {
                    purchases.insert(conn, &row.to_purchase()).await?;
                    summary.purchases_inserted += 1;
                }
            }
        }

        Ok(())
    }
}
