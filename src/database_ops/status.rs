use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::database_ops::db::Db;

/// Process-wide refresh snapshot stored in the single `refresh_status` row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, sqlx::FromRow)]
pub struct RefreshStatus {
    pub total_countries: i64,
    pub last_refreshed_at: Option<DateTime<Utc>>,
}

const STATUS_ROW_ID: i64 = 1;

impl Db {
    /// `{0, None}` until a refresh has completed.
    pub async fn refresh_status(&self) -> Result<RefreshStatus> {
        let row = sqlx::query_as::<_, RefreshStatus>(
            "SELECT total_countries, last_refreshed_at FROM refresh_status WHERE id = ?",
        )
        .bind(STATUS_ROW_ID)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match row {
            Some(status) if status.last_refreshed_at.is_some() => status,
            _ => RefreshStatus::default(),
        })
    }

    pub async fn record_refresh(&self, total_countries: i64, at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            "INSERT INTO refresh_status (id, total_countries, last_refreshed_at) VALUES (?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET \
               total_countries = excluded.total_countries, \
               last_refreshed_at = excluded.last_refreshed_at",
        )
        .bind(STATUS_ROW_ID)
        .bind(total_countries)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
