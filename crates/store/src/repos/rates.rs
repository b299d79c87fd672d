//! Currency rate repository
//!
//! The rate table is seeded at init and consulted read-only by the
//! normalizer. Unknown codes fall back to 1.0 at lookup time, so an empty
//! table degrades to pass-through conversion.

use std::collections::HashMap;

use turso::Database;

use crate::error::Result;
use crate::models::CurrencyRate;
use crate::repos::numeric;

/// Currency rate repository
pub struct RateRepo<'a> {
    db: &'a Database,
}

impl<'a> RateRepo<'a> {
    /// Create a new rate repository
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Load the whole rate table as a code-to-rate map
    pub async fn all(&self) -> Result<HashMap<String, f64>> {
        let conn = self.db.connect()?;

        let mut rows = conn
            .query("SELECT currency_code, rate_to_usd FROM currency_rates", ())
            .await?;

        let mut map = HashMap::new();
        while let Some(row) = rows.next().await? {
            let code: String = row.get(0)?;
            map.insert(code, numeric(&row.get_value(1)?).unwrap_or(1.0));
        }

        Ok(map)
    }

    /// List all rates ordered by currency code
    pub async fn list(&self) -> Result<Vec<CurrencyRate>> {
        let conn = self.db.connect()?;

        let mut rows = conn
            .query(
                r#"
                SELECT currency_code, rate_to_usd, last_updated
                FROM currency_rates ORDER BY currency_code
                "#,
                (),
            )
            .await?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(CurrencyRate {
                currency_code: row.get(0)?,
                rate_to_usd: numeric(&row.get_value(1)?).unwrap_or(1.0),
                last_updated: row.get(2)?,
            });
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Store;

    #[tokio::test]
    async fn test_seeded_rates_present() {
        let store = Store::open_memory().await.unwrap();
        let repo = RateRepo::new(store.database());

        let rates = repo.all().await.unwrap();
        assert!((rates["USD"] - 1.0).abs() < 1e-12);
        assert!((rates["CNY"] - 0.15).abs() < 1e-12);
        assert!((rates["KRW"] - 0.00084).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_list_ordered() {
        let store = Store::open_memory().await.unwrap();
        let repo = RateRepo::new(store.database());

        let rates = repo.list().await.unwrap();
        assert_eq!(rates.len(), crate::db::DEFAULT_RATES.len());
        let codes: Vec<&str> = rates.iter().map(|r| r.currency_code.as_str()).collect();
        let mut sorted = codes.clone();
        sorted.sort_unstable();
        assert_eq!(codes, sorted);
    }
}
