//! Event repository
//!
//! Events are append-only within a run; inserts happen inside the ingestion
//! chunk transaction. The rollup generator reads the whole collection back
//! as one snapshot.

use turso::{Connection, Database};

use crate::error::Result;
use crate::models::{fmt_date, fmt_datetime, parse_date, parse_datetime, Event};
use crate::repos::numeric;
use crate::repos::users::non_empty;

/// Event repository
pub struct EventRepo<'a> {
    db: &'a Database,
}

impl<'a> EventRepo<'a> {
    /// Create a new event repository
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Delete all events (full-refresh clear, inside the caller's transaction)
    pub async fn clear(&self, conn: &Connection) -> Result<u64> {
        Ok(conn.execute("DELETE FROM events", ()).await?)
    }

    /// Insert one event
    pub async fn insert(&self, conn: &Connection, event: &Event) -> Result<()> {
        let event_date = fmt_date(event.event_date);
        let event_time = fmt_datetime(event.event_time);
        let revenue_raw = event.revenue_raw.to_string();
        let revenue_usd = format!("{:.4}", event.revenue_usd);
        let install_time = event.install_time.map(fmt_datetime).unwrap_or_default();

        conn.execute(
            r#"
            INSERT INTO events
            (user_id, event_name, event_value, event_date, event_time, country_code,
             device_model, device_category, app_id, platform, source, revenue_raw,
             revenue_currency, revenue_usd, params_json, install_time)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            "#,
            [
                event.user_id.as_str(),
                event.event_name.as_str(),
                event.event_value.as_deref().unwrap_or(""),
                event_date.as_str(),
                event_time.as_str(),
                event.country_code.as_deref().unwrap_or(""),
                event.device_model.as_deref().unwrap_or(""),
                event.device_category.as_deref().unwrap_or(""),
                event.app_id.as_deref().unwrap_or(""),
                event.platform.as_deref().unwrap_or(""),
                event.source.as_deref().unwrap_or(""),
                revenue_raw.as_str(),
                event.revenue_currency.as_str(),
                revenue_usd.as_str(),
                event.params_json.as_deref().unwrap_or(""),
                install_time.as_str(),
            ],
        )
        .await?;

        Ok(())
    }

    /// Count events
    pub async fn count(&self) -> Result<u64> {
        let conn = self.db.connect()?;

        let mut rows = conn
            .query("SELECT COUNT(*) as count FROM events", ())
            .await?;

        if let Some(row) = rows.next().await? {
            let count: i64 = row.get(0)?;
            Ok(count as u64)
        } else {
            Ok(0)
        }
    }

    /// Read the whole event collection in insertion order
    pub async fn list_all(&self) -> Result<Vec<Event>> {
        let conn = self.db.connect()?;

        let mut rows = conn
            .query(
                r#"
                SELECT user_id, event_name, event_value, event_date, event_time, country_code,
                       device_model, device_category, app_id, platform, source, revenue_raw,
                       revenue_currency, revenue_usd, params_json, install_time
                FROM events ORDER BY id
                "#,
                (),
            )
            .await?;

        let mut events = Vec::new();
        while let Some(row) = rows.next().await? {
            events.push(Self::row_to_event(&row)?);
        }

        Ok(events)
    }

    fn row_to_event(row: &turso::Row) -> Result<Event> {
        let user_id: String = row.get(0)?;
        let event_name: String = row.get(1)?;
        let event_value: String = row.get(2)?;
        let event_date: String = row.get(3)?;
        let event_time: String = row.get(4)?;
        let country_code: String = row.get(5)?;
        let device_model: String = row.get(6)?;
        let device_category: String = row.get(7)?;
        let app_id: String = row.get(8)?;
        let platform: String = row.get(9)?;
        let source: String = row.get(10)?;
        let revenue_raw = numeric(&row.get_value(11)?).unwrap_or(0.0);
        let revenue_currency: String = row.get(12)?;
        let revenue_usd = numeric(&row.get_value(13)?).unwrap_or(0.0);
        let params_json: String = row.get(14)?;
        let install_time: String = row.get(15)?;

        Ok(Event {
            user_id,
            event_name,
            event_value: non_empty(event_value),
            event_date: parse_date(&event_date)?,
            event_time: parse_datetime(&event_time)?,
            country_code: non_empty(country_code),
            device_model: non_empty(device_model),
            device_category: non_empty(device_category),
            app_id: non_empty(app_id),
            platform: non_empty(platform),
            source: non_empty(source),
            revenue_raw,
            revenue_currency,
            revenue_usd,
            params_json: non_empty(params_json),
            install_time: if install_time.is_empty() {
                None
            } else {
                Some(parse_datetime(&install_time)?)
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Store;
    use chrono::NaiveDate;

    fn sample_event(user_id: &str, name: &str, usd: f64) -> Event {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        Event {
            user_id: user_id.to_string(),
            event_name: name.to_string(),
            event_value: None,
            event_date: date,
            event_time: date.and_hms_opt(10, 30, 0).unwrap(),
            country_code: Some("DE".to_string()),
            device_model: Some("Pixel 8".to_string()),
            device_category: Some("mobile_phone".to_string()),
            app_id: Some("com.example.app".to_string()),
            platform: Some("android".to_string()),
            source: Some("googleadwords_int".to_string()),
            revenue_raw: 0.0,
            revenue_currency: "USD".to_string(),
            revenue_usd: usd,
            params_json: None,
            install_time: None,
        }
    }

    #[tokio::test]
    async fn test_insert_and_list() {
        let store = Store::open_memory().await.unwrap();
        let repo = EventRepo::new(store.database());
        let conn = store.connect().unwrap();

        repo.insert(&conn, &sample_event("u1", "app_open", 0.0))
            .await
            .unwrap();
        repo.insert(&conn, &sample_event("u1", "af_purchase", 9.99))
            .await
            .unwrap();

        let events = repo.list_all().await.unwrap();
        assert_eq!(events.len(), 2);
        // Insertion order preserved
        assert_eq!(events[0].event_name, "app_open");
        assert_eq!(events[1].event_name, "af_purchase");
        assert!((events[1].revenue_usd - 9.99).abs() < 1e-9);
        assert_eq!(events[0].country_code.as_deref(), Some("DE"));
    }

    #[tokio::test]
    async fn test_usd_revenue_stored_with_four_decimals() {
        let store = Store::open_memory().await.unwrap();
        let repo = EventRepo::new(store.database());
        let conn = store.connect().unwrap();

        let mut event = sample_event("u1", "af_purchase", 0.0);
        event.revenue_usd = 15.0;
        repo.insert(&conn, &event).await.unwrap();

        let events = repo.list_all().await.unwrap();
        assert!((events[0].revenue_usd - 15.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_count_and_clear() {
        let store = Store::open_memory().await.unwrap();
        let repo = EventRepo::new(store.database());
        let conn = store.connect().unwrap();

        repo.insert(&conn, &sample_event("u1", "app_open", 0.0))
            .await
            .unwrap();
        assert_eq!(repo.count().await.unwrap(), 1);

        repo.clear(&conn).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 0);
        assert!(repo.list_all().await.unwrap().is_empty());
    }
}
