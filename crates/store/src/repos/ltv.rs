//! User LTV repository
//!
//! The LTV table is replaced wholesale each run: delete plus re-insert in one
//! transaction, so a failure leaves the previous figures intact.

use tracing::info;
use turso::{Connection, Database};

use crate::error::Result;
use crate::models::{fmt_date, parse_date, UserLtv};
use crate::repos::numeric;

/// User LTV repository
pub struct LtvRepo<'a> {
    db: &'a Database,
}

impl<'a> LtvRepo<'a> {
    /// Create a new LTV repository
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Replace the whole table with `rows`
    ///
    /// Runs delete and inserts in a single transaction; any failure rolls
    /// back and the previous contents survive.
    pub async fn replace_all(&self, rows: &[UserLtv]) -> Result<usize> {
        let conn = self.db.connect()?;

        conn.execute("BEGIN", ()).await?;

        match Self::write_all(&conn, rows).await {
            Ok(()) => {
                conn.execute("COMMIT", ()).await?;
                info!(users = rows.len(), "Replaced user LTV table");
                Ok(rows.len())
            }
            Err(e) => {
                let _ = conn.execute("ROLLBACK", ()).await;
                Err(e)
            }
        }
    }

    async fn write_all(conn: &Connection, rows: &[UserLtv]) -> Result<()> {
        conn.execute("DELETE FROM user_ltv", ()).await?;

        for row in rows {
            let first = fmt_date(row.first_purchase_date);
            let last = fmt_date(row.last_purchase_date);
            let ltv_1d = format!("{:.4}", row.ltv_1d);
            let ltv_7d = format!("{:.4}", row.ltv_7d);
            let ltv_14d = format!("{:.4}", row.ltv_14d);
            let ltv_30d = format!("{:.4}", row.ltv_30d);
            let ltv_60d = format!("{:.4}", row.ltv_60d);
            let ltv_90d = format!("{:.4}", row.ltv_90d);
            let ltv_total = format!("{:.4}", row.ltv_total);
            let purchase_count = row.purchase_count.to_string();

            conn.execute(
                r#"
                INSERT INTO user_ltv
                (user_id, first_purchase_date, ltv_1d, ltv_7d, ltv_14d, ltv_30d,
                 ltv_60d, ltv_90d, ltv_total, purchase_count, last_purchase_date)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                "#,
                [
                    row.user_id.as_str(),
                    first.as_str(),
                    ltv_1d.as_str(),
                    ltv_7d.as_str(),
                    ltv_14d.as_str(),
                    ltv_30d.as_str(),
                    ltv_60d.as_str(),
                    ltv_90d.as_str(),
                    ltv_total.as_str(),
                    purchase_count.as_str(),
                    last.as_str(),
                ],
            )
            .await?;
        }

        Ok(())
    }

    /// Get the LTV row for a user
    pub async fn get(&self, user_id: &str) -> Result<Option<UserLtv>> {
        let conn = self.db.connect()?;

        let mut rows = conn
            .query(
                r#"
                SELECT user_id, first_purchase_date, ltv_1d, ltv_7d, ltv_14d, ltv_30d,
                       ltv_60d, ltv_90d, ltv_total, purchase_count, last_purchase_date
                FROM user_ltv WHERE user_id = ?1
                "#,
                [user_id],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_ltv(&row)?))
        } else {
            Ok(None)
        }
    }

    /// List all LTV rows ordered by user id
    pub async fn list_all(&self) -> Result<Vec<UserLtv>> {
        let conn = self.db.connect()?;

        let mut rows = conn
            .query(
                r#"
                SELECT user_id, first_purchase_date, ltv_1d, ltv_7d, ltv_14d, ltv_30d,
                       ltv_60d, ltv_90d, ltv_total, purchase_count, last_purchase_date
                FROM user_ltv ORDER BY user_id
                "#,
                (),
            )
            .await?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(Self::row_to_ltv(&row)?);
        }

        Ok(out)
    }

    /// Count LTV rows
    pub async fn count(&self) -> Result<u64> {
        let conn = self.db.connect()?;

        let mut rows = conn
            .query("SELECT COUNT(*) as count FROM user_ltv", ())
            .await?;

        if let Some(row) = rows.next().await? {
            let count: i64 = row.get(0)?;
            Ok(count as u64)
        } else {
            Ok(0)
        }
    }

    fn row_to_ltv(row: &turso::Row) -> Result<UserLtv> {
        let user_id: String = row.get(0)?;
        let first: String = row.get(1)?;
        let ltv_1d = numeric(&row.get_value(2)?).unwrap_or(0.0);
        let ltv_7d = numeric(&row.get_value(3)?).unwrap_or(0.0);
        let ltv_14d = numeric(&row.get_value(4)?).unwrap_or(0.0);
        let ltv_30d = numeric(&row.get_value(5)?).unwrap_or(0.0);
        let ltv_60d = numeric(&row.get_value(6)?).unwrap_or(0.0);
        let ltv_90d = numeric(&row.get_value(7)?).unwrap_or(0.0);
        let ltv_total = numeric(&row.get_value(8)?).unwrap_or(0.0);
        let purchase_count: i64 = row.get(9)?;
        let last: String = row.get(10)?;

        Ok(UserLtv {
            user_id,
            first_purchase_date: parse_date(&first)?,
            ltv_1d,
            ltv_7d,
            ltv_14d,
            ltv_30d,
            ltv_60d,
            ltv_90d,
            ltv_total,
            purchase_count,
            last_purchase_date: parse_date(&last)?,
        })
    }
}
