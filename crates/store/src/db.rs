//! Database connection and schema management
//!
//! Uses Turso (async SQLite-compatible) for the backing store. Schema
//! creation is idempotent; `init` seeds the currency rate table with the
//! default conversion set.

use std::path::Path;

use tracing::{debug, info};
use turso::{Builder, Connection, Database};

use crate::error::{Result, StoreError};

/// Backing store for the pipeline
///
/// Owns the single database holding the canonical collections
/// (users/events/purchases), the derived outputs (user_ltv, daily/country/
/// device stats) and the currency rate table.
#[derive(Debug)]
pub struct Store {
    db: Database,
    path: String,
}

impl Store {
    /// Open (creating if necessary) the database at `path` and apply the
    /// schema
    ///
    /// Creates the parent directory when missing. Also seeds the default
    /// currency rates, so a freshly initialized store is immediately usable
    /// for ingestion.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::invalid("db_path", format!("failed to create directory: {}", e))
                })?;
            }
        }

        let path_str = path.display().to_string();
        info!(path = %path_str, "Opening database");

        let db = Builder::new_local(&path_str).build().await?;

        let store = Self { db, path: path_str };
        store.init_schema().await?;
        store.seed_default_rates().await?;

        Ok(store)
    }

    /// Open an existing database, failing when the file does not exist
    ///
    /// Used by the processing commands, which must not silently start from
    /// an empty store. Schema application is idempotent and re-run here so
    /// upgraded binaries can add tables.
    pub async fn open_existing<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(StoreError::not_initialized(path.display().to_string()));
        }

        let path_str = path.display().to_string();
        debug!(path = %path_str, "Opening existing database");

        let db = Builder::new_local(&path_str).build().await?;

        let store = Self { db, path: path_str };
        store.init_schema().await?;

        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub async fn open_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:").build().await?;

        let store = Self {
            db,
            path: ":memory:".to_string(),
        };
        store.init_schema().await?;
        store.seed_default_rates().await?;

        Ok(store)
    }

    /// Get a connection to the database
    pub fn connect(&self) -> Result<Connection> {
        Ok(self.db.connect()?)
    }

    /// Get the underlying database handle
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Path of the database file (`:memory:` for in-memory stores)
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Apply the full schema (tables and indexes), idempotently
    async fn init_schema(&self) -> Result<()> {
        let conn = self.db.connect()?;

        // Canonical collections
        conn.execute(SCHEMA_USERS, ()).await?;
        conn.execute(SCHEMA_EVENTS, ()).await?;
        conn.execute(SCHEMA_PURCHASES, ()).await?;

        // Derived outputs
        conn.execute(SCHEMA_USER_LTV, ()).await?;
        conn.execute(SCHEMA_DAILY_STATS, ()).await?;
        conn.execute(SCHEMA_COUNTRY_STATS, ()).await?;
        conn.execute(SCHEMA_DEVICE_STATS, ()).await?;

        // Collaborator tables
        conn.execute(SCHEMA_CURRENCY_RATES, ()).await?;

        // Indexes
        conn.execute(INDEX_EVENTS_DATE, ()).await?;
        conn.execute(INDEX_EVENTS_USER, ()).await?;
        conn.execute(INDEX_EVENTS_NAME, ()).await?;
        conn.execute(INDEX_EVENTS_COUNTRY_DEVICE, ()).await?;
        conn.execute(INDEX_USERS_FIRST_SEEN, ()).await?;
        conn.execute(INDEX_USERS_COUNTRY_DEVICE, ()).await?;
        conn.execute(INDEX_PURCHASES_USER, ()).await?;
        conn.execute(INDEX_PURCHASES_DATE, ()).await?;
        conn.execute(INDEX_PURCHASES_KEY, ()).await?;
        conn.execute(INDEX_COUNTRY_STATS_DATE, ()).await?;
        conn.execute(INDEX_DEVICE_STATS_DATE, ()).await?;

        info!("Database schema initialized");
        Ok(())
    }

    /// Seed the currency rate table with the default conversion set
    ///
    /// Uses `INSERT OR REPLACE`, so re-running `init` refreshes the
    /// defaults without disturbing other tables.
    async fn seed_default_rates(&self) -> Result<()> {
        let conn = self.db.connect()?;
        let now = chrono::Utc::now().to_rfc3339();

        for (code, rate) in DEFAULT_RATES {
            let rate_str = rate.to_string();
            conn.execute(
                r#"
                INSERT OR REPLACE INTO currency_rates (currency_code, rate_to_usd, last_updated)
                VALUES (?1, ?2, ?3)
                "#,
                [*code, rate_str.as_str(), now.as_str()],
            )
            .await?;
        }

        debug!(count = DEFAULT_RATES.len(), "Seeded currency rates");
        Ok(())
    }
}

/// Default currency conversion rates (code, rate to USD)
///
/// Unknown codes fall back to 1.0 at normalization time.
pub const DEFAULT_RATES: &[(&str, f64)] = &[
    ("USD", 1.0),
    ("EUR", 1.1),
    ("JPY", 0.0091),
    ("GBP", 1.3),
    ("AUD", 0.75),
    ("CAD", 0.78),
    ("CNY", 0.15),
    ("HKD", 0.13),
    ("TWD", 0.036),
    ("KRW", 0.00084),
    ("INR", 0.014),
    ("SGD", 0.74),
    ("MYR", 0.24),
    ("THB", 0.031),
    ("IDR", 0.000071),
    ("PHP", 0.020),
    ("VND", 0.000044),
];

// =============================================================================
// Canonical collections
// =============================================================================

const SCHEMA_USERS: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    user_id TEXT PRIMARY KEY,
    first_seen_date TEXT NOT NULL,
    last_seen_date TEXT NOT NULL,
    country_code TEXT,
    device_model TEXT,
    device_category TEXT,
    platform TEXT,
    source TEXT,
    install_time TEXT
)
"#;

const SCHEMA_EVENTS: &str = r#"
CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    event_name TEXT NOT NULL,
    event_value TEXT,
    event_date TEXT NOT NULL,
    event_time TEXT NOT NULL,
    country_code TEXT,
    device_model TEXT,
    device_category TEXT,
    app_id TEXT,
    platform TEXT,
    source TEXT,
    revenue_raw REAL,
    revenue_currency TEXT,
    revenue_usd REAL,
    params_json TEXT,
    install_time TEXT
)
"#;

const SCHEMA_PURCHASES: &str = r#"
CREATE TABLE IF NOT EXISTS purchases (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    purchase_time TEXT NOT NULL,
    purchase_date TEXT NOT NULL,
    country_code TEXT,
    device_category TEXT,
    revenue_usd REAL NOT NULL,
    product_id TEXT,
    order_id TEXT
)
"#;

// =============================================================================
// Derived outputs
// =============================================================================

const SCHEMA_USER_LTV: &str = r#"
CREATE TABLE IF NOT EXISTS user_ltv (
    user_id TEXT PRIMARY KEY,
    first_purchase_date TEXT,
    ltv_1d REAL DEFAULT 0,
    ltv_7d REAL DEFAULT 0,
    ltv_14d REAL DEFAULT 0,
    ltv_30d REAL DEFAULT 0,
    ltv_60d REAL DEFAULT 0,
    ltv_90d REAL DEFAULT 0,
    ltv_total REAL DEFAULT 0,
    purchase_count INTEGER DEFAULT 0,
    last_purchase_date TEXT
)
"#;

const SCHEMA_DAILY_STATS: &str = r#"
CREATE TABLE IF NOT EXISTS daily_stats (
    stat_date TEXT PRIMARY KEY,
    user_count INTEGER DEFAULT 0,
    new_user_count INTEGER DEFAULT 0,
    event_count INTEGER DEFAULT 0,
    purchase_count INTEGER DEFAULT 0,
    revenue_usd REAL DEFAULT 0,
    device_count INTEGER DEFAULT 0,
    country_count INTEGER DEFAULT 0
)
"#;

const SCHEMA_COUNTRY_STATS: &str = r#"
CREATE TABLE IF NOT EXISTS country_stats (
    stat_date TEXT NOT NULL,
    country_code TEXT NOT NULL,
    user_count INTEGER DEFAULT 0,
    event_count INTEGER DEFAULT 0,
    revenue_usd REAL DEFAULT 0,
    PRIMARY KEY (stat_date, country_code)
)
"#;

const SCHEMA_DEVICE_STATS: &str = r#"
CREATE TABLE IF NOT EXISTS device_stats (
    stat_date TEXT NOT NULL,
    device_category TEXT NOT NULL,
    user_count INTEGER DEFAULT 0,
    event_count INTEGER DEFAULT 0,
    revenue_usd REAL DEFAULT 0,
    PRIMARY KEY (stat_date, device_category)
)
"#;

// =============================================================================
// Collaborator tables
// =============================================================================

const SCHEMA_CURRENCY_RATES: &str = r#"
CREATE TABLE IF NOT EXISTS currency_rates (
    currency_code TEXT PRIMARY KEY,
    rate_to_usd REAL NOT NULL,
    last_updated TEXT NOT NULL
)
"#;

// =============================================================================
// Indexes
// =============================================================================

const INDEX_EVENTS_DATE: &str =
    "CREATE INDEX IF NOT EXISTS idx_events_event_date ON events(event_date)";

const INDEX_EVENTS_USER: &str = "CREATE INDEX IF NOT EXISTS idx_events_user_id ON events(user_id)";

const INDEX_EVENTS_NAME: &str =
    "CREATE INDEX IF NOT EXISTS idx_events_event_name ON events(event_name)";

const INDEX_EVENTS_COUNTRY_DEVICE: &str = "CREATE INDEX IF NOT EXISTS idx_events_country_device ON events(country_code, device_category)";

const INDEX_USERS_FIRST_SEEN: &str =
    "CREATE INDEX IF NOT EXISTS idx_users_first_seen ON users(first_seen_date)";

const INDEX_USERS_COUNTRY_DEVICE: &str = "CREATE INDEX IF NOT EXISTS idx_users_country_device ON users(country_code, device_category)";

const INDEX_PURCHASES_USER: &str =
    "CREATE INDEX IF NOT EXISTS idx_purchases_user ON purchases(user_id)";

const INDEX_PURCHASES_DATE: &str =
    "CREATE INDEX IF NOT EXISTS idx_purchases_date ON purchases(purchase_date)";

const INDEX_PURCHASES_KEY: &str = "CREATE INDEX IF NOT EXISTS idx_purchases_key ON purchases(user_id, order_id, purchase_time)";

const INDEX_COUNTRY_STATS_DATE: &str =
    "CREATE INDEX IF NOT EXISTS idx_country_stats_date ON country_stats(stat_date)";

const INDEX_DEVICE_STATS_DATE: &str =
    "CREATE INDEX IF NOT EXISTS idx_device_stats_date ON device_stats(stat_date)";
