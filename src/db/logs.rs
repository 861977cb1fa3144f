//! Processing log: append-only per-batch event trail.

use crate::error::DatabaseError;
use crate::types::LogLevel;
use crate::{Error, Result};
use sqlx::SqliteConnection;

use super::{Database, LogRow};

impl Database {
    /// Append a log entry outside any other transaction
    pub async fn insert_log(
        &self,
        batch_row_id: i64,
        item_id: Option<i64>,
        level: LogLevel,
        message: &str,
        details: &serde_json::Value,
    ) -> Result<()> {
        let mut conn = self.pool.acquire().await.map_err(|e| {
            Error::Database(DatabaseError::ConnectionFailed(format!(
                "Failed to acquire connection: {}",
                e
            )))
        })?;

        Self::write_log(&mut conn, batch_row_id, item_id, level, message, details).await
    }

    /// Append a log entry on an open connection or transaction
    ///
    /// Used by the state transitions so the entry commits or rolls back with them.
    pub(crate) async fn write_log(
        conn: &mut SqliteConnection,
        batch_row_id: i64,
        item_id: Option<i64>,
        level: LogLevel,
        message: &str,
        details: &serde_json::Value,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO processing_logs (batch_id, item_id, level, message, details, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(batch_row_id)
        .bind(item_id)
        .bind(level.as_str())
        .bind(message)
        .bind(details.to_string())
        .bind(chrono::Utc::now().timestamp())
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to insert processing log: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// List log entries for a batch, newest first
    pub async fn list_logs(&self, batch_row_id: i64, offset: i64, limit: i64) -> Result<Vec<LogRow>> {
        let rows = sqlx::query_as::<_, LogRow>(
            r#"
            SELECT id, batch_id, item_id, level, message, details, created_at
            FROM processing_logs
            WHERE batch_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(batch_row_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list processing logs: {}",
                e
            )))
        })?;

        Ok(rows)
    }
}
