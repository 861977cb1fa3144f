//! Batch CRUD and lifecycle transitions.

use crate::Result;
use crate::types::{BatchId, LogLevel};
use sqlx::SqliteConnection;

use super::{BatchRow, Database, NewBatch, NewItem, batch_status, item_status, query_failed};

const BATCH_COLUMNS: &str = r#"
    id, batch_id, owner, name, description, source_filename, status,
    total_items, completed_count, failed_count, default_config, error_message,
    created_at, started_at, completed_at
"#;

/// Result of a successful cancellation
#[derive(Debug, Clone)]
pub struct CancelledBatch {
    /// Batch as stored after the cancellation committed
    pub batch: BatchRow,
    /// Number of queued items moved to skipped
    pub skipped_items: u64,
}

impl Database {
    /// Insert a batch together with its items and the creation log entry
    ///
    /// Runs in a single transaction: either the batch and every item exist
    /// afterwards, or nothing was written. Items get `order_index` equal to
    /// their position in `items`.
    pub async fn create_batch_with_items(
        &self,
        batch: &NewBatch,
        items: &[NewItem],
    ) -> Result<BatchRow> {
        let now = chrono::Utc::now().timestamp();
        let total = items.len() as i64;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(query_failed("begin batch creation"))?;

        let result = sqlx::query(
            r#"
            INSERT INTO article_batches (
                batch_id, owner, name, description, source_filename,
                status, total_items, completed_count, failed_count,
                default_config, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, 0, 0, ?, ?)
            "#,
        )
        .bind(&batch.batch_id)
        .bind(&batch.owner)
        .bind(&batch.name)
        .bind(&batch.description)
        .bind(&batch.source_filename)
        .bind(batch_status::PENDING)
        .bind(total)
        .bind(&batch.default_config)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(query_failed("insert batch"))?;

        let batch_row_id = result.last_insert_rowid();

        for (order_index, item) in items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO batch_articles (
                    batch_id, order_index, topic, keywords, tone, word_count,
                    custom_persona, link_count, use_inline_links, use_apa_style,
                    extra_fields, status, attempt_count, queued_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?)
                "#,
            )
            .bind(batch_row_id)
            .bind(order_index as i64)
            .bind(&item.topic)
            .bind(&item.keywords)
            .bind(&item.tone)
            .bind(item.word_count)
            .bind(&item.custom_persona)
            .bind(item.link_count)
            .bind(item.use_inline_links)
            .bind(item.use_apa_style)
            .bind(&item.extra_fields)
            .bind(item_status::QUEUED)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(query_failed("insert batch item"))?;
        }

        Self::write_log(
            &mut tx,
            batch_row_id,
            None,
            LogLevel::Info,
            &format!("Batch created with {} articles", total),
            &serde_json::json!({ "total_items": total }),
        )
        .await?;

        let row = sqlx::query_as::<_, BatchRow>(&format!(
            "SELECT {BATCH_COLUMNS} FROM article_batches WHERE id = ?"
        ))
        .bind(batch_row_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(query_failed("read created batch"))?;

        tx.commit()
            .await
            .map_err(query_failed("commit batch creation"))?;

        Ok(row)
    }

    /// Get a batch by its public identifier
    pub async fn get_batch(&self, batch_id: &BatchId) -> Result<Option<BatchRow>> {
        let row = sqlx::query_as::<_, BatchRow>(&format!(
            "SELECT {BATCH_COLUMNS} FROM article_batches WHERE batch_id = ?"
        ))
        .bind(batch_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_failed("get batch"))?;

        Ok(row)
    }

    /// Get a batch by its internal row id
    pub async fn get_batch_by_row_id(&self, id: i64) -> Result<Option<BatchRow>> {
        let row = sqlx::query_as::<_, BatchRow>(&format!(
            "SELECT {BATCH_COLUMNS} FROM article_batches WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_failed("get batch by row id"))?;

        Ok(row)
    }

    /// List an owner's batches, newest first, optionally filtered by status
    pub async fn list_batches(
        &self,
        owner: &str,
        status: Option<i32>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<BatchRow>> {
        let rows = sqlx::query_as::<_, BatchRow>(&format!(
            r#"
            SELECT {BATCH_COLUMNS} FROM article_batches
            WHERE owner = ? AND (? IS NULL OR status = ?)
            ORDER BY created_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#
        ))
        .bind(owner)
        .bind(status)
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(query_failed("list batches"))?;

        Ok(rows)
    }

    /// Find the batch the worker should run next
    ///
    /// An interrupted batch (`processing` with queued items left) wins over
    /// pending ones; within each group the oldest batch comes first.
    pub async fn next_runnable_batch(&self) -> Result<Option<BatchRow>> {
        let row = sqlx::query_as::<_, BatchRow>(&format!(
            r#"
            SELECT {BATCH_COLUMNS} FROM article_batches b
            WHERE b.status = ?
               OR (b.status = ? AND EXISTS (
                    SELECT 1 FROM batch_articles a
                    WHERE a.batch_id = b.id AND a.status = ?
               ))
            ORDER BY CASE WHEN b.status = ? THEN 0 ELSE 1 END, b.created_at ASC, b.id ASC
            LIMIT 1
            "#
        ))
        .bind(batch_status::PENDING)
        .bind(batch_status::PROCESSING)
        .bind(item_status::QUEUED)
        .bind(batch_status::PROCESSING)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_failed("find next runnable batch"))?;

        Ok(row)
    }

    /// Claim a pending batch for processing
    ///
    /// Returns false if the batch is no longer `pending` (e.g. it was cancelled
    /// in the meantime); nothing is written in that case.
    pub async fn claim_batch(&self, id: i64) -> Result<bool> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(query_failed("begin batch claim"))?;

        let result = sqlx::query(
            "UPDATE article_batches SET status = ?, started_at = ? WHERE id = ? AND status = ?",
        )
        .bind(batch_status::PROCESSING)
        .bind(now)
        .bind(id)
        .bind(batch_status::PENDING)
        .execute(&mut *tx)
        .await
        .map_err(query_failed("claim batch"))?;

        if result.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(query_failed("roll back batch claim"))?;
            return Ok(false);
        }

        Self::write_log(
            &mut tx,
            id,
            None,
            LogLevel::Info,
            "Batch status changed to processing",
            &serde_json::json!({}),
        )
        .await?;

        tx.commit().await.map_err(query_failed("commit batch claim"))?;
        Ok(true)
    }

    /// Mark a batch completed if it is still processing and every item is accounted for
    ///
    /// Returns true if this call performed the transition.
    pub async fn finalize_if_done(&self, id: i64) -> Result<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(query_failed("begin batch finalization"))?;

        let finalized = Self::finalize_on(&mut tx, id).await?;

        tx.commit()
            .await
            .map_err(query_failed("commit batch finalization"))?;
        Ok(finalized)
    }

    /// Completion check on an open transaction
    pub(crate) async fn finalize_on(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            r#"
            UPDATE article_batches
            SET status = ?, completed_at = ?
            WHERE id = ? AND status = ? AND completed_count + failed_count >= total_items
            "#,
        )
        .bind(batch_status::COMPLETED)
        .bind(now)
        .bind(id)
        .bind(batch_status::PROCESSING)
        .execute(&mut *conn)
        .await
        .map_err(query_failed("complete batch"))?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        let (completed, failed): (i64, i64) = sqlx::query_as(
            "SELECT completed_count, failed_count FROM article_batches WHERE id = ?",
        )
        .bind(id)
        .fetch_one(&mut *conn)
        .await
        .map_err(query_failed("read batch counters"))?;

        Self::write_log(
            conn,
            id,
            None,
            LogLevel::Info,
            "Batch status changed to completed",
            &serde_json::json!({
                "completed_count": completed,
                "failed_count": failed,
            }),
        )
        .await?;

        Ok(true)
    }

    /// Mark a non-terminal batch failed after a worker-level error
    ///
    /// Returns false if the batch already reached a terminal status.
    pub async fn mark_batch_failed(&self, id: i64, error: &str) -> Result<bool> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(query_failed("begin batch failure"))?;

        let result = sqlx::query(
            r#"
            UPDATE article_batches
            SET status = ?, completed_at = ?, error_message = ?
            WHERE id = ? AND status IN (?, ?)
            "#,
        )
        .bind(batch_status::FAILED)
        .bind(now)
        .bind(error)
        .bind(id)
        .bind(batch_status::PENDING)
        .bind(batch_status::PROCESSING)
        .execute(&mut *tx)
        .await
        .map_err(query_failed("mark batch failed"))?;

        if result.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(query_failed("roll back batch failure"))?;
            return Ok(false);
        }

        Self::write_log(
            &mut tx,
            id,
            None,
            LogLevel::Error,
            "Batch status changed to failed",
            &serde_json::json!({ "error": error }),
        )
        .await?;

        tx.commit()
            .await
            .map_err(query_failed("commit batch failure"))?;
        Ok(true)
    }

    /// Cancel a pending or processing batch and skip its queued items
    ///
    /// Returns `None` without writing anything if the batch is already terminal.
    /// An item currently in flight is left alone and finishes normally.
    pub async fn cancel_batch(&self, id: i64, owner: &str) -> Result<Option<CancelledBatch>> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(query_failed("begin batch cancellation"))?;

        let result = sqlx::query(
            r#"
            UPDATE article_batches
            SET status = ?, completed_at = ?
            WHERE id = ? AND status IN (?, ?)
            "#,
        )
        .bind(batch_status::CANCELLED)
        .bind(now)
        .bind(id)
        .bind(batch_status::PENDING)
        .bind(batch_status::PROCESSING)
        .execute(&mut *tx)
        .await
        .map_err(query_failed("cancel batch"))?;

        if result.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(query_failed("roll back batch cancellation"))?;
            return Ok(None);
        }

        let skipped = sqlx::query(
            "UPDATE batch_articles SET status = ?, completed_at = ? WHERE batch_id = ? AND status = ?",
        )
        .bind(item_status::SKIPPED)
        .bind(now)
        .bind(id)
        .bind(item_status::QUEUED)
        .execute(&mut *tx)
        .await
        .map_err(query_failed("skip queued items"))?
        .rows_affected();

        Self::write_log(
            &mut tx,
            id,
            None,
            LogLevel::Warning,
            "Batch cancelled by user",
            &serde_json::json!({
                "owner": owner,
                "skipped_items": skipped,
            }),
        )
        .await?;

        let batch = sqlx::query_as::<_, BatchRow>(&format!(
            "SELECT {BATCH_COLUMNS} FROM article_batches WHERE id = ?"
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(query_failed("read cancelled batch"))?;

        tx.commit()
            .await
            .map_err(query_failed("commit batch cancellation"))?;

        Ok(Some(CancelledBatch {
            batch,
            skipped_items: skipped,
        }))
    }
}
