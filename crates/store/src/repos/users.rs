//! User repository
//!
//! Users are created from the first observed row for an id; later rows only
//! extend `last_seen_date`. Creation and extension run inside the ingestion
//! chunk transaction, so both methods take the caller's connection.

use std::collections::HashMap;

use chrono::NaiveDate;
use turso::{Connection, Database};

use crate::error::Result;
use crate::models::{fmt_date, fmt_datetime, parse_date, parse_datetime, User};

/// User repository
pub struct UserRepo<'a> {
    db: &'a Database,
}

impl<'a> UserRepo<'a> {
    /// Create a new user repository
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Delete all users (full-refresh clear, inside the caller's transaction)
    pub async fn clear(&self, conn: &Connection) -> Result<u64> {
        Ok(conn.execute("DELETE FROM users", ()).await?)
    }

    /// Check whether a user id already exists
    ///
    /// Reads through the caller's connection so writes from the open chunk
    /// transaction are visible alongside committed prior chunks.
    pub async fn exists(&self, conn: &Connection, user_id: &str) -> Result<bool> {
        let mut rows = conn
            .query("SELECT 1 FROM users WHERE user_id = ?1", [user_id])
            .await?;

        Ok(rows.next().await?.is_some())
    }

    /// Insert a new user (first observed row wins for all attributes)
    pub async fn insert(&self, conn: &Connection, user: &User) -> Result<()> {
        conn.execute(
            r#"
            INSERT INTO users
            (user_id, first_seen_date, last_seen_date, country_code, device_model,
             device_category, platform, source, install_time)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            [
                user.user_id.as_str(),
                fmt_date(user.first_seen_date).as_str(),
                fmt_date(user.last_seen_date).as_str(),
                user.country_code.as_deref().unwrap_or(""),
                user.device_model.as_deref().unwrap_or(""),
                user.device_category.as_deref().unwrap_or(""),
                user.platform.as_deref().unwrap_or(""),
                user.source.as_deref().unwrap_or(""),
                user.install_time
                    .map(fmt_datetime)
                    .unwrap_or_default()
                    .as_str(),
            ],
        )
        .await?;

        Ok(())
    }

    /// Extend a user's last seen date, never shrinking it
    ///
    /// ISO dates compare correctly as strings, so the guard runs in SQL.
    pub async fn extend_last_seen(
        &self,
        conn: &Connection,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<()> {
        let date_str = fmt_date(date);

        conn.execute(
            "UPDATE users SET last_seen_date = ?1 WHERE user_id = ?2 AND last_seen_date < ?1",
            [date_str.as_str(), user_id],
        )
        .await?;

        Ok(())
    }

    /// Get a user by id
    pub async fn get_by_id(&self, user_id: &str) -> Result<Option<User>> {
        let conn = self.db.connect()?;

        let mut rows = conn
            .query(
                r#"
                SELECT user_id, first_seen_date, last_seen_date, country_code, device_model,
                       device_category, platform, source, install_time
                FROM users WHERE user_id = ?1
                "#,
                [user_id],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_user(&row)?))
        } else {
            Ok(None)
        }
    }

    /// Count users
    pub async fn count(&self) -> Result<u64> {
        let conn = self.db.connect()?;

        let mut rows = conn
            .query("SELECT COUNT(*) as count FROM users", ())
            .await?;

        if let Some(row) = rows.next().await? {
            let count: i64 = row.get(0)?;
            Ok(count as u64)
        } else {
            Ok(0)
        }
    }

    /// Map of user id to first seen date, for new-user rollups
    pub async fn first_seen_dates(&self) -> Result<HashMap<String, NaiveDate>> {
        let conn = self.db.connect()?;

        let mut rows = conn
            .query("SELECT user_id, first_seen_date FROM users", ())
            .await?;

        let mut map = HashMap::new();
        while let Some(row) = rows.next().await? {
            let user_id: String = row.get(0)?;
            let first_seen: String = row.get(1)?;
            map.insert(user_id, parse_date(&first_seen)?);
        }

        Ok(map)
    }

    fn row_to_user(row: &turso::Row) -> Result<User> {
        let user_id: String = row.get(0)?;
        let first_seen: String = row.get(1)?;
        let last_seen: String = row.get(2)?;
        let country_code: String = row.get(3)?;
        let device_model: String = row.get(4)?;
        let device_category: String = row.get(5)?;
        let platform: String = row.get(6)?;
        let source: String = row.get(7)?;
        let install_time: String = row.get(8)?;

        Ok(User {
            user_id,
            first_seen_date: parse_date(&first_seen)?,
            last_seen_date: parse_date(&last_seen)?,
            country_code: non_empty(country_code),
            device_model: non_empty(device_model),
            device_category: non_empty(device_category),
            platform: non_empty(platform),
            source: non_empty(source),
            install_time: if install_time.is_empty() {
                None
            } else {
                Some(parse_datetime(&install_time)?)
            },
        })
    }
}

pub(crate) fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}
