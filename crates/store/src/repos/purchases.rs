//! Purchase repository
//!
//! Purchases are the deduplicated purchase-event subset of the event stream.
//! The dedup decision is an existence probe on the identity key
//! `(user_id, order_id, purchase_time)`, run on the ingesting connection so
//! it sees committed prior chunks plus the open transaction's own writes.

use turso::{Connection, Database};

use crate::error::Result;
use crate::models::{fmt_date, fmt_datetime, parse_date, parse_datetime, Purchase};
use crate::repos::numeric;
use crate::repos::users::non_empty;

/// Purchase repository
pub struct PurchaseRepo<'a> {
    db: &'a Database,
}

impl<'a> PurchaseRepo<'a> {
    /// Create a new purchase repository
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Delete all purchases (full-refresh clear, inside the caller's transaction)
    pub async fn clear(&self, conn: &Connection) -> Result<u64> {
        Ok(conn.execute("DELETE FROM purchases", ()).await?)
    }

    /// Check whether a purchase with this identity key is already stored
    ///
    /// `purchase_time` is the canonical `%Y-%m-%d %H:%M:%S` string; a missing
    /// order id is probed as the empty string, matching how it is stored.
    pub async fn exists_key(
        &self,
        conn: &Connection,
        user_id: &str,
        order_id: &str,
        purchase_time: &str,
    ) -> Result<bool> {
        let mut rows = conn
            .query(
                r#"
                SELECT 1 FROM purchases
                WHERE user_id = ?1 AND order_id = ?2 AND purchase_time = ?3
                "#,
                [user_id, order_id, purchase_time],
            )
            .await?;

        Ok(rows.next().await?.is_some())
    }

    /// Insert one purchase
    pub async fn insert(&self, conn: &Connection, purchase: &Purchase) -> Result<()> {
        let purchase_time = fmt_datetime(purchase.purchase_time);
        let purchase_date = fmt_date(purchase.purchase_date);
        let revenue_usd = format!("{:.4}", purchase.revenue_usd);

        conn.execute(
            r#"
            INSERT INTO purchases
            (user_id, purchase_time, purchase_date, country_code, device_category,
             revenue_usd, product_id, order_id)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            [
                purchase.user_id.as_str(),
                purchase_time.as_str(),
                purchase_date.as_str(),
                purchase.country_code.as_deref().unwrap_or(""),
                purchase.device_category.as_deref().unwrap_or(""),
                revenue_usd.as_str(),
                purchase.product_id.as_deref().unwrap_or(""),
                purchase.order_id.as_deref().unwrap_or(""),
            ],
        )
        .await?;

        Ok(())
    }

    /// Count purchases
    pub async fn count(&self) -> Result<u64> {
        let conn = self.db.connect()?;

        let mut rows = conn
            .query("SELECT COUNT(*) as count FROM purchases", ())
            .await?;

        if let Some(row) = rows.next().await? {
            let count: i64 = row.get(0)?;
            Ok(count as u64)
        } else {
            Ok(0)
        }
    }

    /// Read all purchases grouped by user, dates ascending within each group
    pub async fn list_ordered(&self) -> Result<Vec<Purchase>> {
        let conn = self.db.connect()?;

        let mut rows = conn
            .query(
                r#"
                SELECT user_id, purchase_time, purchase_date, country_code, device_category,
                       revenue_usd, product_id, order_id
                FROM purchases
                ORDER BY user_id, purchase_date, purchase_time, id
                "#,
                (),
            )
            .await?;

        let mut purchases = Vec::new();
        while let Some(row) = rows.next().await? {
            purchases.push(Self::row_to_purchase(&row)?);
        }

        Ok(purchases)
    }

    fn row_to_purchase(row: &turso::Row) -> Result<Purchase> {
        let user_id: String = row.get(0)?;
        let purchase_time: String = row.get(1)?;
        let purchase_date: String = row.get(2)?;
        let country_code: String = row.get(3)?;
        let device_category: String = row.get(4)?;
        let revenue_usd = numeric(&row.get_value(5)?).unwrap_or(0.0);
        let product_id: String = row.get(6)?;
        let order_id: String = row.get(7)?;

        Ok(Purchase {
            user_id,
            purchase_time: parse_datetime(&purchase_time)?,
            purchase_date: parse_date(&purchase_date)?,
            country_code: non_empty(country_code),
            device_category: non_empty(device_category),
            revenue_usd,
            product_id: non_empty(product_id),
            order_id: non_empty(order_id),
        })
    }
}
