//! Cohort-windowed lifetime value
//!
//! Buckets each user's purchase revenue into fixed windows anchored to the
//! user's first purchase date. Windows are nested (a day-3 purchase counts
//! toward the 7, 14, 30, 60 and 90 day windows and the total), which is
//! what makes the figures monotone non-decreasing across window sizes.
//!
//! Needs the complete purchase history per user, so it runs only after full
//! ingestion and replaces the whole `user_ltv` table.

use tracing::{info, warn};

use cohort_store::{Purchase, Store, UserLtv};

use crate::error::Result;

/// Counters describing one LTV run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LtvSummary {
    /// Purchases scanned
    pub purchases: usize,
    /// Users with at least one purchase
    pub users: usize,
}

/// Per-user LTV aggregation over the purchases collection
pub struct LtvAggregator<'a> {
    store: &'a Store,
}

impl<'a> LtvAggregator<'a> {
    /// Create an aggregator over a store
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Recompute and replace the `user_ltv` table
    pub async fn run(&self) -> Result<LtvSummary> {
        let purchases = self.store.purchases().list_ordered().await?;

        if purchases.is_empty() {
            warn!("No purchases found; user LTV table will be empty");
        }

        let rows = compute_ltv(&purchases);
        let users = self.store.ltv().replace_all(&rows).await?;

        info!(purchases = purchases.len(), users, "Computed user LTV");

        Ok(LtvSummary {
            purchases: purchases.len(),
            users,
        })
    }
}

/// Compute one LTV row per user from purchases ordered by
/// `(user_id, purchase_date)`
pub fn compute_ltv(purchases: &[Purchase]) -> Vec<UserLtv> {
    let mut rows: Vec<UserLtv> = Vec::new();

    for purchase in purchases {
        let start_new_group = match rows.last() {
            Some(row) => row.user_id != purchase.user_id,
            None => true,
        };
        if start_new_group {
            rows.push(new_row(purchase));
        }
        if let Some(row) = rows.last_mut() {
            add_purchase(row, purchase);
        }
    }

    rows
}

/// Empty row anchored to the group's first purchase date
fn new_row(purchase: &Purchase) -> UserLtv {
    UserLtv {
        user_id: purchase.user_id.clone(),
        first_purchase_date: purchase.purchase_date,
        ltv_1d: 0.0,
        ltv_7d: 0.0,
        ltv_14d: 0.0,
        ltv_30d: 0.0,
        ltv_60d: 0.0,
        ltv_90d: 0.0,
        ltv_total: 0.0,
        purchase_count: 0,
        last_purchase_date: purchase.purchase_date,
    }
}

/// Fold one purchase into the user's windows
///
/// Input ordering makes the first purchase seen the earliest, so
/// `days_elapsed` is never negative. Thresholds are inclusive of day 0.
fn add_purchase(row: &mut UserLtv, purchase: &Purchase) {
    let days_elapsed = (purchase.purchase_date - row.first_purchase_date).num_days();
    let revenue = purchase.revenue_usd;

    row.ltv_total += revenue;

    if days_elapsed <= 0 {
        row.ltv_1d += revenue;
    }
    if days_elapsed <= 6 {
        row.ltv_7d += revenue;
    }
    if days_elapsed <= 13 {
        row.ltv_14d += revenue;
    }
    if days_elapsed <= 29 {
        row.ltv_30d += revenue;
    }
    if days_elapsed <= 59 {
        row.ltv_60d += revenue;
    }
    if days_elapsed <= 89 {
        row.ltv_90d += revenue;
    }

    row.purchase_count += 1;
    if purchase.purchase_date > row.last_purchase_date {
        row.last_purchase_date = purchase.purchase_date;
    }
}
