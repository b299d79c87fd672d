//! Cohort Canonical Store
//!
//! Turso-backed persistence for the normalized attribution collections and
//! the derived analytical outputs.
//!
//! # Tables
//!
//! | Table | Contents | Refresh |
//! |-------|----------|---------|
//! | `users` | One row per attributed user | Full, per ingestion run |
//! | `events` | One row per usable input row | Full, per ingestion run |
//! | `purchases` | Deduplicated purchase events | Full, per ingestion run |
//! | `user_ltv` | Cohort-windowed revenue per user | Full, per LTV run |
//! | `daily_stats` / `country_stats` / `device_stats` | Dimensional rollups | Full, per rollup run |
//! | `currency_rates` | Conversion rates to USD | Seeded at init |
//!
//! # Usage
//!
//! ```ignore
//! use cohort_store::Store;
//!
//! // File-based (production)
//! let store = Store::open("data/app.db").await?;
//!
//! // In-memory (testing)
//! let store = Store::open_memory().await?;
//!
//! // Access repositories
//! let users = store.users();
//! let count = users.count().await?;
//! ```

pub mod db;
pub mod error;
pub mod models;
pub mod repos;

// Re-exports
pub use db::{Store, DEFAULT_RATES};
pub use error::{Result, StoreError};
pub use models::{
    fmt_date, fmt_datetime, parse_date, parse_datetime, CountryStat, CurrencyRate, DailyStat,
    DeviceStat, Event, Purchase, User, UserLtv, DATETIME_FORMAT, DATE_FORMAT,
};
pub use repos::{EventRepo, LtvRepo, PurchaseRepo, RateRepo, StatsRepo, UserRepo};

impl Store {
    /// Get the user repository
    pub fn users(&self) -> UserRepo<'_> {
        UserRepo::new(self.database())
    }

    /// Get the event repository
    pub fn events(&self) -> EventRepo<'_> {
        EventRepo::new(self.database())
    }

    /// Get the purchase repository
    pub fn purchases(&self) -> PurchaseRepo<'_> {
        PurchaseRepo::new(self.database())
    }

    /// Get the user LTV repository
    pub fn ltv(&self) -> LtvRepo<'_> {
        LtvRepo::new(self.database())
    }

    /// Get the rollup statistics repository
    pub fn stats(&self) -> StatsRepo<'_> {
        StatsRepo::new(self.database())
    }

    /// Get the currency rate repository
    pub fn rates(&self) -> RateRepo<'_> {
        RateRepo::new(self.database())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn sample_user(id: &str) -> User {
        User {
            user_id: id.to_string(),
            first_seen_date: day(1),
            last_seen_date: day(1),
            country_code: Some("US".to_string()),
            device_model: Some("iPhone14,2".to_string()),
            device_category: Some("mobile_phone".to_string()),
            platform: Some("ios".to_string()),
            source: Some("organic".to_string()),
            install_time: None,
        }
    }

    #[tokio::test]
    async fn test_rollback_preserves_prior_data() {
        let store = Store::open_memory().await.unwrap();
        let conn = store.connect().unwrap();

        store.users().insert(&conn, &sample_user("u1")).await.unwrap();

        // Open a transaction, write, then roll it back
        conn.execute("BEGIN", ()).await.unwrap();
        store.users().insert(&conn, &sample_user("u2")).await.unwrap();
        conn.execute("ROLLBACK", ()).await.unwrap();

        assert_eq!(store.users().count().await.unwrap(), 1);
        assert!(store.users().get_by_id("u2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_transaction_writes_visible_before_commit() {
        let store = Store::open_memory().await.unwrap();
        let conn = store.connect().unwrap();

        conn.execute("BEGIN", ()).await.unwrap();
        store.users().insert(&conn, &sample_user("u1")).await.unwrap();

        // The ingesting connection sees its own uncommitted write
        assert!(store.users().exists(&conn, "u1").await.unwrap());

        conn.execute("COMMIT", ()).await.unwrap();
        assert!(store.users().exists(&conn, "u1").await.unwrap());
    }

    #[tokio::test]
    async fn test_open_existing_rejects_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.db");

        let err = Store::open_existing(&path).await.unwrap_err();
        assert!(matches!(err, StoreError::NotInitialized { .. }));
        assert!(err.to_string().contains("not initialized"));
    }

    #[tokio::test]
    async fn test_open_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.db");

        {
            let store = Store::open(&path).await.unwrap();
            let conn = store.connect().unwrap();
            store.users().insert(&conn, &sample_user("u1")).await.unwrap();
        }

        let store = Store::open_existing(&path).await.unwrap();
        assert_eq!(store.users().count().await.unwrap(), 1);
        // Rates were seeded by the first open
        assert!(!store.rates().all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_init_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.db");

        Store::open(&path).await.unwrap();
        let store = Store::open(&path).await.unwrap();

        assert_eq!(
            store.rates().all().await.unwrap().len(),
            DEFAULT_RATES.len()
        );
    }
}
