//! Rollup statistics repository
//!
//! The three rollup tables (daily, per-country, per-device) are derived from
//! the same event snapshot and replaced together in one transaction, keeping
//! them mutually consistent.

use tracing::info;
use turso::{Connection, Database};

use crate::error::Result;
use crate::models::{fmt_date, parse_date, CountryStat, DailyStat, DeviceStat};
use crate::repos::numeric;

/// Rollup statistics repository
pub struct StatsRepo<'a> {
    db: &'a Database,
}

impl<'a> StatsRepo<'a> {
    /// Create a new stats repository
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Replace all three rollup tables in one transaction
    pub async fn replace_all(
        &self,
        daily: &[DailyStat],
        country: &[CountryStat],
        device: &[DeviceStat],
    ) -> Result<()> {
        let conn = self.db.connect()?;

        conn.execute("BEGIN", ()).await?;

        match Self::write_all(&conn, daily, country, device).await {
            Ok(()) => {
                conn.execute("COMMIT", ()).await?;
                info!(
                    daily = daily.len(),
                    country = country.len(),
                    device = device.len(),
                    "Replaced rollup tables"
                );
                Ok(())
            }
            Err(e) => {
                let _ = conn.execute("ROLLBACK", ()).await;
                Err(e)
            }
        }
    }

    async fn write_all(
        conn: &Connection,
        daily: &[DailyStat],
        country: &[CountryStat],
        device: &[DeviceStat],
    ) -> Result<()> {
        conn.execute("DELETE FROM daily_stats", ()).await?;
        conn.execute("DELETE FROM country_stats", ()).await?;
        conn.execute("DELETE FROM device_stats", ()).await?;

        for stat in daily {
            let date = fmt_date(stat.date);
            let user_count = stat.user_count.to_string();
            let new_user_count = stat.new_user_count.to_string();
            let event_count = stat.event_count.to_string();
            let purchase_count = stat.purchase_count.to_string();
            let revenue_usd = format!("{:.4}", stat.revenue_usd);
            let device_count = stat.device_count.to_string();
            let country_count = stat.country_count.to_string();

            conn.execute(
                r#"
                INSERT INTO daily_stats
                (stat_date, user_count, new_user_count, event_count, purchase_count,
                 revenue_usd, device_count, country_count)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                [
                    date.as_str(),
                    user_count.as_str(),
                    new_user_count.as_str(),
                    event_count.as_str(),
                    purchase_count.as_str(),
                    revenue_usd.as_str(),
                    device_count.as_str(),
                    country_count.as_str(),
                ],
            )
            .await?;
        }

        for stat in country {
            let date = fmt_date(stat.date);
            let user_count = stat.user_count.to_string();
            let event_count = stat.event_count.to_string();
            let revenue_usd = format!("{:.4}", stat.revenue_usd);

            conn.execute(
                r#"
                INSERT INTO country_stats
                (stat_date, country_code, user_count, event_count, revenue_usd)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                [
                    date.as_str(),
                    stat.country_code.as_str(),
                    user_count.as_str(),
                    event_count.as_str(),
                    revenue_usd.as_str(),
                ],
            )
            .await?;
        }

        for stat in device {
            let date = fmt_date(stat.date);
            let user_count = stat.user_count.to_string();
            let event_count = stat.event_count.to_string();
            let revenue_usd = format!("{:.4}", stat.revenue_usd);

            conn.execute(
                r#"
                INSERT INTO device_stats
                (stat_date, device_category, user_count, event_count, revenue_usd)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                [
                    date.as_str(),
                    stat.device_category.as_str(),
                    user_count.as_str(),
                    event_count.as_str(),
                    revenue_usd.as_str(),
                ],
            )
            .await?;
        }

        Ok(())
    }

    /// List daily stats ordered by date
    pub async fn daily(&self) -> Result<Vec<DailyStat>> {
        let conn = self.db.connect()?;

        let mut rows = conn
            .query(
                r#"
                SELECT stat_date, user_count, new_user_count, event_count, purchase_count,
                       revenue_usd, device_count, country_count
                FROM daily_stats ORDER BY stat_date
                "#,
                (),
            )
            .await?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            let date: String = row.get(0)?;
            out.push(DailyStat {
                date: parse_date(&date)?,
                user_count: row.get(1)?,
                new_user_count: row.get(2)?,
                event_count: row.get(3)?,
                purchase_count: row.get(4)?,
                revenue_usd: numeric(&row.get_value(5)?).unwrap_or(0.0),
                device_count: row.get(6)?,
                country_count: row.get(7)?,
            });
        }

        Ok(out)
    }

    /// List country stats ordered by date then country
    pub async fn country(&self) -> Result<Vec<CountryStat>> {
        let conn = self.db.connect()?;

        let mut rows = conn
            .query(
                r#"
                SELECT stat_date, country_code, user_count, event_count, revenue_usd
                FROM country_stats ORDER BY stat_date, country_code
                "#,
                (),
            )
            .await?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            let date: String = row.get(0)?;
            out.push(CountryStat {
                date: parse_date(&date)?,
                country_code: row.get(1)?,
                user_count: row.get(2)?,
                event_count: row.get(3)?,
                revenue_usd: numeric(&row.get_value(4)?).unwrap_or(0.0),
            });
        }

        Ok(out)
    }

    /// List device stats ordered by date then category
    pub async fn device(&self) -> Result<Vec<DeviceStat>> {
        let conn = self.db.connect()?;

        let mut rows = conn
            .query(
                r#"
                SELECT stat_date, device_category, user_count, event_count, revenue_usd
                FROM device_stats ORDER BY stat_date, device_category
                "#,
                (),
            )
            .await?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            let date: String = row.get(0)?;
            out.push(DeviceStat {
                date: parse_date(&date)?,
                device_category: row.get(1)?,
                user_count: row.get(2)?,
                event_count: row.get(3)?,
                revenue_usd: numeric(&row.get_value(4)?).unwrap_or(0.0),
            });
        }

        Ok(out)
    }
}
