//! Canonical entity types
//!
//! Normalized records produced by ingestion (users, events, purchases) and
//! the derived outputs (per-user LTV, dimensional rollups). All dates are
//! naive wall-clock values; the canonical string forms are `%Y-%m-%d` for
//! dates and `%Y-%m-%d %H:%M:%S` for timestamps.

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{Result, StoreError};

/// Canonical date format used in storage
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Canonical timestamp format used in storage (also the dedup key form)
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format a date in the canonical storage form
pub fn fmt_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Format a timestamp in the canonical storage form
pub fn fmt_datetime(ts: NaiveDateTime) -> String {
    ts.format(DATETIME_FORMAT).to_string()
}

/// Parse a canonical date string
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map_err(|e| StoreError::invalid("date", format!("'{}': {}", s, e)))
}

/// Parse a canonical timestamp string
pub fn parse_datetime(s: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
        .map_err(|e| StoreError::invalid("datetime", format!("'{}': {}", s, e)))
}

/// One attributed user
///
/// Created from the first row observed for the user id; later rows only
/// extend `last_seen_date`.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// Attribution SDK user id
    pub user_id: String,
    /// Date of the first observed event
    pub first_seen_date: NaiveDate,
    /// Date of the latest observed event
    pub last_seen_date: NaiveDate,
    /// Country code from the first observed row
    pub country_code: Option<String>,
    /// Device model string from the first observed row
    pub device_model: Option<String>,
    /// Device category derived from the model
    pub device_category: Option<String>,
    /// Platform (android, ios, ...)
    pub platform: Option<String>,
    /// Acquisition media source
    pub source: Option<String>,
    /// App install time
    pub install_time: Option<NaiveDateTime>,
}

/// One observed activity record
///
/// Events are append-only within a run and replaced wholesale by the next
/// full refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub user_id: String,
    pub event_name: String,
    /// Raw event value payload (often JSON)
    pub event_value: Option<String>,
    /// Calendar date of `event_time`
    pub event_date: NaiveDate,
    pub event_time: NaiveDateTime,
    pub country_code: Option<String>,
    pub device_model: Option<String>,
    pub device_category: Option<String>,
    pub app_id: Option<String>,
    pub platform: Option<String>,
    pub source: Option<String>,
    /// Revenue in the original currency
    pub revenue_raw: f64,
    pub revenue_currency: String,
    /// Revenue converted to USD, rounded to 4 decimal places
    pub revenue_usd: f64,
    /// Structured event parameters as JSON
    pub params_json: Option<String>,
    pub install_time: Option<NaiveDateTime>,
}

/// One deduplicated purchase
///
/// Identity key: `(user_id, order_id-or-empty, canonical purchase_time)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Purchase {
    pub user_id: String,
    pub purchase_time: NaiveDateTime,
    pub purchase_date: NaiveDate,
    pub country_code: Option<String>,
    pub device_category: Option<String>,
    /// Always strictly positive
    pub revenue_usd: f64,
    pub product_id: Option<String>,
    pub order_id: Option<String>,
}

/// Per-user lifetime value, bucketed into cohort windows
///
/// Windows are nested and anchored to the first purchase date, so
/// `ltv_1d <= ltv_7d <= ... <= ltv_90d <= ltv_total` always holds.
#[derive(Debug, Clone, PartialEq)]
pub struct UserLtv {
    pub user_id: String,
    pub first_purchase_date: NaiveDate,
    pub ltv_1d: f64,
    pub ltv_7d: f64,
    pub ltv_14d: f64,
    pub ltv_30d: f64,
    pub ltv_60d: f64,
    pub ltv_90d: f64,
    pub ltv_total: f64,
    pub purchase_count: i64,
    pub last_purchase_date: NaiveDate,
}

/// Per-day activity rollup
#[derive(Debug, Clone, PartialEq)]
pub struct DailyStat {
    pub date: NaiveDate,
    /// Distinct users active on the date
    pub user_count: i64,
    /// Users whose first seen date equals the date
    pub new_user_count: i64,
    pub event_count: i64,
    /// Count of purchase-named events
    pub purchase_count: i64,
    /// Revenue summed over purchase-named events
    pub revenue_usd: f64,
    /// Distinct device categories seen on the date
    pub device_count: i64,
    /// Distinct country codes seen on the date
    pub country_count: i64,
}

/// Per-day, per-country activity rollup
#[derive(Debug, Clone, PartialEq)]
pub struct CountryStat {
    pub date: NaiveDate,
    pub country_code: String,
    pub user_count: i64,
    pub event_count: i64,
    pub revenue_usd: f64,
}

/// Per-day, per-device-category activity rollup
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceStat {
    pub date: NaiveDate,
    pub device_category: String,
    pub user_count: i64,
    pub event_count: i64,
    pub revenue_usd: f64,
}

/// One currency conversion rate
#[derive(Debug, Clone, PartialEq)]
pub struct CurrencyRate {
    pub currency_code: String,
    pub rate_to_usd: f64,
    /// When the rate was last written, RFC 3339
    pub last_updated: String,
}
