//! Record normalization
//!
//! Turns one raw row into a canonical record: multi-format timestamp
//! parsing, device category extraction, currency normalization, USD
//! conversion, product id and params extraction. Missing fields degrade to
//! documented defaults; parse failures are recorded as field issues on the
//! row instead of aborting it.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use cohort_store::{Event, Purchase, User};

use crate::raw::RawRow;

// Input columns
pub const COL_USER_ID: &str = "appsflyer_id";
pub const COL_EVENT_NAME: &str = "event_name";
pub const COL_EVENT_VALUE: &str = "event_value";
pub const COL_EVENT_TIME: &str = "event_time";
pub const COL_INSTALL_TIME: &str = "install_time";
pub const COL_COUNTRY: &str = "country_code";
pub const COL_DEVICE_MODEL: &str = "device_model";
pub const COL_APP_ID: &str = "app_id";
pub const COL_PLATFORM: &str = "platform";
pub const COL_SOURCE: &str = "media_source";
pub const COL_REVENUE: &str = "event_revenue";
pub const COL_CURRENCY: &str = "event_revenue_currency";
pub const COL_REVENUE_USD: &str = "event_revenue_usd";
pub const COL_ORDER_ID: &str = "order_id";

/// Key inside a JSON `event_value` payload that carries the product id
const CONTENT_ID_KEY: &str = "af_content_id";

/// Fallback columns probed for a product id, in priority order
const PRODUCT_ID_COLUMNS: &[&str] = &["af_content_id", "product_id", "sku"];

// Defaults for missing fields
pub const DEFAULT_EVENT_NAME: &str = "unknown_event";
pub const DEFAULT_COUNTRY: &str = "unknown";
pub const DEFAULT_DEVICE_MODEL: &str = "unknown_device";
pub const DEFAULT_DEVICE_CATEGORY: &str = "unknown_device_category";
pub const DEFAULT_CURRENCY: &str = "USD";

/// A field-level normalization problem
///
/// Issues never abort the row; the pipeline logs them and continues with the
/// documented default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    /// Input column the problem was found in
    pub column: &'static str,
    /// What went wrong
    pub reason: String,
}

impl Issue {
    fn new(column: &'static str, reason: impl Into<String>) -> Self {
        Self {
            column,
            reason: reason.into(),
        }
    }
}

/// Why a row was dropped entirely
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// No user id: the row cannot be attributed to anyone
    MissingUserId,
    /// The event time failed every supported format: the row cannot be dated
    UnparseableEventTime(String),
}

/// Outcome of normalizing one raw row
#[derive(Debug)]
pub enum RowOutcome {
    /// The row is usable (possibly with field issues)
    Usable(Box<NormalizedRow>),
    /// The row was dropped
    Skipped(SkipReason),
}

/// One canonical record
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    pub user_id: String,
    pub event_name: String,
    pub event_value: Option<String>,
    pub event_date: NaiveDate,
    pub event_time: NaiveDateTime,
    pub install_time: Option<NaiveDateTime>,
    pub country_code: String,
    pub device_model: String,
    pub device_category: String,
    pub app_id: Option<String>,
    pub platform: Option<String>,
    pub source: Option<String>,
    pub revenue_raw: f64,
    pub revenue_currency: String,
    pub revenue_usd: f64,
    pub params_json: Option<String>,
    pub product_id: Option<String>,
    pub order_id: Option<String>,
    /// Field-level problems encountered while normalizing
    pub issues: Vec<Issue>,
}

impl NormalizedRow {
    /// Build the user record this row would create on first sight
    pub fn to_user(&self) -> User {
        User {
            user_id: self.user_id.clone(),
            first_seen_date: self.event_date,
            last_seen_date: self.event_date,
            country_code: Some(self.country_code.clone()),
            device_model: Some(self.device_model.clone()),
            device_category: Some(self.device_category.clone()),
            platform: self.platform.clone(),
            source: self.source.clone(),
            install_time: self.install_time,
        }
    }

    /// Build the event record for this row
    pub fn to_event(&self) -> Event {
        Event {
            user_id: self.user_id.clone(),
            event_name: self.event_name.clone(),
            event_value: self.event_value.clone(),
            event_date: self.event_date,
            event_time: self.event_time,
            country_code: Some(self.country_code.clone()),
            device_model: Some(self.device_model.clone()),
            device_category: Some(self.device_category.clone()),
            app_id: self.app_id.clone(),
            platform: self.platform.clone(),
            source: self.source.clone(),
            revenue_raw: self.revenue_raw,
            revenue_currency: self.revenue_currency.clone(),
            revenue_usd: self.revenue_usd,
            params_json: self.params_json.clone(),
            install_time: self.install_time,
        }
    }

    /// Build the purchase record for this row
    pub fn to_purchase(&self) -> Purchase {
        Purchase {
            user_id: self.user_id.clone(),
            purchase_time: self.event_time,
            purchase_date: self.event_date,
            country_code: Some(self.country_code.clone()),
            device_category: Some(self.device_category.clone()),
            revenue_usd: self.revenue_usd,
            product_id: self.product_id.clone(),
            order_id: self.order_id.clone(),
        }
    }
}

/// Currency code to rate-to-USD lookup
///
/// Unknown codes convert at 1.0.
#[derive(Debug, Clone, Default)]
pub struct RateTable {
    rates: HashMap<String, f64>,
}

impl RateTable {
    /// Build a rate table from a code-to-rate map
    pub fn new(rates: HashMap<String, f64>) -> Self {
        Self { rates }
    }

    /// Rate to USD for a currency code (1.0 for unknown codes)
    pub fn rate_to_usd(&self, code: &str) -> f64 {
        self.rates.get(code).copied().unwrap_or(1.0)
    }
}

/// Record normalizer
///
/// Holds the rate table and the install-time fallback policy; everything
/// else is stateless per row.
pub struct Normalizer {
    rates: RateTable,
    default_install_to_event: bool,
}

impl Normalizer {
    /// Create a normalizer
    pub fn new(rates: RateTable, default_install_to_event: bool) -> Self {
        Self {
            rates,
            default_install_to_event,
        }
    }

    /// Normalize one raw row
    pub fn normalize(&self, row: &RawRow) -> RowOutcome {
        let user_id = match row.get(COL_USER_ID) {
            Some(id) => id.to_string(),
            None => return RowOutcome::Skipped(SkipReason::MissingUserId),
        };

        let raw_time = row.get(COL_EVENT_TIME).unwrap_or("");
        let event_time = match parse_timestamp(raw_time) {
            Some(ts) => ts,
            None => {
                return RowOutcome::Skipped(SkipReason::UnparseableEventTime(
                    raw_time.to_string(),
                ));
            }
        };
        let event_date = event_time.date();

        let mut issues = Vec::new();

        let install_time = self.normalize_install_time(row, event_time, &mut issues);

        let event_name = row
            .get(COL_EVENT_NAME)
            .unwrap_or(DEFAULT_EVENT_NAME)
            .to_string();
        let country_code = row.get(COL_COUNTRY).unwrap_or(DEFAULT_COUNTRY).to_string();

        let raw_model = row.get(COL_DEVICE_MODEL);
        let device_category = device_category(raw_model);
        let device_model = raw_model.unwrap_or(DEFAULT_DEVICE_MODEL).to_string();

        let revenue_currency = normalize_currency(row.get(COL_CURRENCY));
        let revenue_raw = parse_revenue(row, COL_REVENUE, &mut issues);
        let revenue_usd = self.normalize_usd(row, revenue_raw, &revenue_currency, &mut issues);

        let event_value = row.get(COL_EVENT_VALUE).map(str::to_string);
        let params_json = extract_params(row, event_value.as_deref(), &mut issues);
        let product_id = extract_product_id(row, event_value.as_deref());

        RowOutcome::Usable(Box::new(NormalizedRow {
            user_id,
            event_name,
            event_value,
            event_date,
            event_time,
            install_time,
            country_code,
            device_model,
            device_category,
            app_id: row.get(COL_APP_ID).map(str::to_string),
            platform: row.get(COL_PLATFORM).map(str::to_string),
            source: row.get(COL_SOURCE).map(str::to_string),
            revenue_raw: revenue_raw.unwrap_or(0.0),
            revenue_currency,
            revenue_usd,
            params_json,
            product_id,
            order_id: row.get(COL_ORDER_ID).map(str::to_string),
            issues,
        }))
    }

    /// Parse and clamp the install time
    ///
    /// An install observed after the event it belongs to is clamped down to
    /// the event time. When the column is absent the configured fallback
    /// policy decides between the event time and nothing.
    fn normalize_install_time(
        &self,
        row: &RawRow,
        event_time: NaiveDateTime,
        issues: &mut Vec<Issue>,
    ) -> Option<NaiveDateTime> {
        let parsed = match row.get(COL_INSTALL_TIME) {
            Some(raw) => {
                let parsed = parse_timestamp(raw);
                if parsed.is_none() {
                    issues.push(Issue::new(
                        COL_INSTALL_TIME,
                        format!("unparseable timestamp '{}'", raw),
                    ));
                }
                parsed
            }
            None => None,
        };

        match parsed {
            Some(install) if install > event_time => Some(event_time),
            Some(install) => Some(install),
            None if self.default_install_to_event => Some(event_time),
            None => None,
        }
    }

    /// Resolve the USD revenue for a row
    ///
    /// An explicit, parseable USD column wins; otherwise the raw revenue is
    /// converted through the rate table. Either path rounds to 4 decimals.
    fn normalize_usd(
        &self,
        row: &RawRow,
        revenue_raw: Option<f64>,
        currency: &str,
        issues: &mut Vec<Issue>,
    ) -> f64 {
        if let Some(raw) = row.get(COL_REVENUE_USD) {
            match raw.parse::<f64>() {
                Ok(v) if v.is_finite() => return round4(v),
                _ => issues.push(Issue::new(
                    COL_REVENUE_USD,
                    format!("unparseable number '{}'", raw),
                )),
            }
        }

        match revenue_raw {
            Some(raw) if raw != 0.0 => round4(raw * self.rates.rate_to_usd(currency)),
            _ => 0.0,
        }
    }
}

/// Round a revenue value to 4 decimal places
pub fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

/// Parse a timestamp, trying the supported formats in order
///
/// Formats: fractional-seconds+offset, fractional-seconds, offset, plain
/// seconds, date-only (midnight). Offset-carrying values keep their
/// wall-clock component. A purely numeric value is read as Unix epoch
/// seconds (UTC).
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%z") {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%z") {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(dt);
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }

    // Numeric fallback: Unix epoch seconds
    if let Ok(secs) = s.parse::<i64>() {
        return DateTime::from_timestamp(secs, 0).map(|dt| dt.naive_utc());
    }
    if let Ok(secs) = s.parse::<f64>() {
        if secs.is_finite() {
            return DateTime::from_timestamp(secs as i64, 0).map(|dt| dt.naive_utc());
        }
    }

    None
}

/// Derive the device category from the raw model string
pub fn device_category(model: Option<&str>) -> String {
    let model = match model {
        Some(m) if !m.is_empty() => m.to_lowercase(),
        _ => return DEFAULT_DEVICE_CATEGORY.to_string(),
    };

    if model.contains("tablet") || model.contains("pad") {
        return "tablet".to_string();
    }
    if model.contains("mobile") || model.contains("phone") {
        return "mobile_phone".to_string();
    }
    match model.split_once("::") {
        Some((prefix, _)) => prefix.to_string(),
        None => "mobile_phone".to_string(),
    }
}

/// Upper-case a currency code, defaulting missing/blank to USD
pub fn normalize_currency(code: Option<&str>) -> String {
    match code {
        Some(c) if !c.trim().is_empty() => c.trim().to_uppercase(),
        _ => DEFAULT_CURRENCY.to_string(),
    }
}

fn parse_revenue(row: &RawRow, column: &'static str, issues: &mut Vec<Issue>) -> Option<f64> {
    let raw = row.get(column)?;
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => {
            issues.push(Issue::new(column, format!("unparseable number '{}'", raw)));
            None
        }
    }
}

/// Extract structured event parameters
///
/// A JSON-object `event_value` is carried verbatim; otherwise non-empty
/// `*params*` columns are collected into one object. Key order in the
/// collected object is sorted, keeping output deterministic.
fn extract_params(
    row: &RawRow,
    event_value: Option<&str>,
    issues: &mut Vec<Issue>,
) -> Option<String> {
    if let Some(value) = event_value {
        if value.trim_start().starts_with('{') {
            match serde_json::from_str::<serde_json::Value>(value) {
                Ok(parsed) if parsed.is_object() => return Some(value.to_string()),
                Ok(_) => {}
                Err(e) => issues.push(Issue::new(COL_EVENT_VALUE, format!("invalid JSON: {}", e))),
            }
        }
    }

    let mut params = serde_json::Map::new();
    for (column, value) in row.iter() {
        if column.contains("params") {
            params.insert(
                column.to_string(),
                serde_json::Value::String(value.to_string()),
            );
        }
    }

    if params.is_empty() {
        None
    } else {
        Some(serde_json::Value::Object(params).to_string())
    }
}

/// Extract the product id
///
/// A JSON-object `event_value` carrying the content-id key wins; otherwise
/// the fallback columns are probed in priority order.
fn extract_product_id(row: &RawRow, event_value: Option<&str>) -> Option<String> {
    if let Some(value) = event_value {
        if let Ok(serde_json::Value::Object(obj)) =
            serde_json::from_str::<serde_json::Value>(value.trim())
        {
            match obj.get(CONTENT_ID_KEY) {
                Some(serde_json::Value::String(s)) if !s.is_empty() => return Some(s.clone()),
                Some(serde_json::Value::Number(n)) => return Some(n.to_string()),
                _ => {}
            }
        }
    }

    for column in PRODUCT_ID_COLUMNS {
        if let Some(value) = row.get(column) {
            return Some(value.to_string());
        }
    }

    None
}
