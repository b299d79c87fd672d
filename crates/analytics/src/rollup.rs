//! Dimensional rollups
//!
//! Aggregates one snapshot of the events collection into daily, per-country
//! and per-device summary tables. All three are computed from the same
//! snapshot with the same purchase predicate, so revenue sums agree across
//! them by construction. BTreeMap keys give deterministic output ordering.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;
use tracing::info;

use cohort_store::{CountryStat, DailyStat, DeviceStat, Event, Store};

use crate::error::Result;

/// Counters describing one rollup run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RollupSummary {
    /// Dates with at least one event
    pub days: usize,
    /// (date, country) groups
    pub countries: usize,
    /// (date, device category) groups
    pub devices: usize,
}

/// Rollup generation over the events collection
pub struct RollupGenerator<'a> {
    store: &'a Store,
    purchase_event: String,
}

impl<'a> RollupGenerator<'a> {
    /// Create a generator over a store
    ///
    /// `purchase_event` is the event name whose revenue feeds the rollups.
    pub fn new(store: &'a Store, purchase_event: impl Into<String>) -> Self {
        Self {
            store,
            purchase_event: purchase_event.into(),
        }
    }

    /// Recompute and replace the three rollup tables
    pub async fn run(&self) -> Result<RollupSummary> {
        let events = self.store.events().list_all().await?;
        let first_seen = self.store.users().first_seen_dates().await?;

        let (daily, country, device) = compute_rollups(&events, &first_seen, &self.purchase_event);

        self.store
            .stats()
            .replace_all(&daily, &country, &device)
            .await?;

        info!(
            events = events.len(),
            days = daily.len(),
            "Computed dimensional rollups"
        );

        Ok(RollupSummary {
            days: daily.len(),
            countries: country.len(),
            devices: device.len(),
        })
    }
}

#[derive(Default)]
struct DailyAccum {
    users: HashSet<String>,
    new_users: HashSet<String>,
    events: i64,
    purchases: i64,
    revenue: f64,
    devices: HashSet<String>,
    countries: HashSet<String>,
}

#[derive(Default)]
struct DimAccum {
    users: HashSet<String>,
    events: i64,
    revenue: f64,
}

/// Aggregate one events snapshot into the three rollup collections
pub fn compute_rollups(
    events: &[Event],
    first_seen: &HashMap<String, NaiveDate>,
    purchase_event: &str,
) -> (Vec<DailyStat>, Vec<CountryStat>, Vec<DeviceStat>) {
    let mut daily: BTreeMap<NaiveDate, DailyAccum> = BTreeMap::new();
    let mut country: BTreeMap<(NaiveDate, String), DimAccum> = BTreeMap::new();
    let mut device: BTreeMap<(NaiveDate, String), DimAccum> = BTreeMap::new();

    for event in events {
        let date = event.event_date;
        let country_code = event.country_code.as_deref().unwrap_or("unknown");
        let device_category = event
            .device_category
            .as_deref()
            .unwrap_or("unknown_device_category");

        let is_purchase = event.event_name == purchase_event;
        let revenue = if is_purchase { event.revenue_usd } else { 0.0 };

        let day = daily.entry(date).or_default();
        day.users.insert(event.user_id.clone());
        if first_seen.get(&event.user_id) == Some(&date) {
            day.new_users.insert(event.user_id.clone());
        }
        day.events += 1;
        if is_purchase {
            day.purchases += 1;
        }
        day.revenue += revenue;
        day.devices.insert(device_category.to_string());
        day.countries.insert(country_code.to_string());

        let by_country = country
            .entry((date, country_code.to_string()))
            .or_default();
        by_country.users.insert(event.user_id.clone());
        by_country.events += 1;
        by_country.revenue += revenue;

        let by_device = device
            .entry((date, device_category.to_string()))
            .or_default();
        by_device.users.insert(event.user_id.clone());
        by_device.events += 1;
        by_device.revenue += revenue;
    }

    let daily_stats = daily
        .into_iter()
        .map(|(date, accum)| DailyStat {
            date,
            user_count: accum.users.len() as i64,
            new_user_count: accum.new_users.len() as i64,
            event_count: accum.events,
            purchase_count: accum.purchases,
            revenue_usd: accum.revenue,
            device_count: accum.devices.len() as i64,
            country_count: accum.countries.len() as i64,
        })
        .collect();

    let country_stats = country
        .into_iter()
        .map(|((date, country_code), accum)| CountryStat {
            date,
            country_code,
            user_count: accum.users.len() as i64,
            event_count: accum.events,
            revenue_usd: accum.revenue,
        })
        .collect();

    let device_stats = device
        .into_iter()
        .map(|((date, device_category), accum)| DeviceStat {
            date,
            device_category,
            user_count: accum.users.len() as i64,
            event_count: accum.events,
            revenue_usd: accum.revenue,
        })
        .collect();

    (daily_stats, country_stats, device_stats)
}
