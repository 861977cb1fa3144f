//! Item claiming and outcome recording.

use crate::Result;
use crate::generation::GeneratedArticle;
use crate::types::LogLevel;
use sqlx::SqliteConnection;

use super::{Database, ItemRow, item_status, query_failed};

const ITEM_COLUMNS: &str = r#"
    id, batch_id, order_index, topic, keywords, tone, word_count,
    custom_persona, link_count, use_inline_links, use_apa_style, extra_fields,
    status, attempt_count, error_message, generated_title, generated_content,
    meta_description, actual_word_count, queued_at, started_at, completed_at,
    processing_duration_seconds
"#;

/// Batch counters after an item outcome was recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemRecorded {
    /// Items completed successfully
    pub completed_count: i64,
    /// Items that failed
    pub failed_count: i64,
    /// Whether this outcome moved the batch to `completed`
    pub batch_completed: bool,
}

/// Outcome of one generation attempt
enum Outcome<'a> {
    Completed(&'a GeneratedArticle),
    Failed(&'a str),
}

impl Database {
    /// List a batch's items in processing order
    pub async fn list_items(&self, batch_row_id: i64) -> Result<Vec<ItemRow>> {
        let rows = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM batch_articles WHERE batch_id = ? ORDER BY order_index ASC"
        ))
        .bind(batch_row_id)
        .fetch_all(&self.pool)
        .await
        .map_err(query_failed("list batch items"))?;

        Ok(rows)
    }

    /// Get an item by id
    pub async fn get_item(&self, id: i64) -> Result<Option<ItemRow>> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM batch_articles WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_failed("get batch item"))?;

        Ok(row)
    }

    /// Lowest-ordered queued item of a batch
    pub async fn next_queued_item(&self, batch_row_id: i64) -> Result<Option<ItemRow>> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            r#"
            SELECT {ITEM_COLUMNS} FROM batch_articles
            WHERE batch_id = ? AND status = ?
            ORDER BY order_index ASC
            LIMIT 1
            "#
        ))
        .bind(batch_row_id)
        .bind(item_status::QUEUED)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_failed("find next queued item"))?;

        Ok(row)
    }

    /// Claim a queued item: `queued -> processing`, bump `attempt_count`
    ///
    /// Returns false if the item is no longer queued (skipped by a cancel).
    pub async fn claim_item(&self, item: &ItemRow) -> Result<bool> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(query_failed("begin item claim"))?;

        let result = sqlx::query(
            r#"
            UPDATE batch_articles
            SET status = ?, started_at = ?, attempt_count = attempt_count + 1
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(item_status::PROCESSING)
        .bind(now)
        .bind(item.id)
        .bind(item_status::QUEUED)
        .execute(&mut *tx)
        .await
        .map_err(query_failed("claim item"))?;

        if result.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(query_failed("roll back item claim"))?;
            return Ok(false);
        }

        Self::write_log(
            &mut tx,
            item.batch_id,
            Some(item.id),
            LogLevel::Info,
            "Article status changed to processing",
            &serde_json::json!({ "order_index": item.order_index }),
        )
        .await?;

        tx.commit().await.map_err(query_failed("commit item claim"))?;
        Ok(true)
    }

    /// Record a successful generation and update the batch counters
    ///
    /// Returns `None` if the item was not `processing` (nothing written).
    pub async fn complete_item(
        &self,
        item: &ItemRow,
        article: &GeneratedArticle,
        duration_seconds: f64,
    ) -> Result<Option<ItemRecorded>> {
        self.record_outcome(item, Outcome::Completed(article), Some(duration_seconds))
            .await
    }

    /// Record a failed generation and update the batch counters
    ///
    /// Returns `None` if the item was not `processing` (nothing written).
    pub async fn fail_item(
        &self,
        item: &ItemRow,
        error: &str,
        duration_seconds: Option<f64>,
    ) -> Result<Option<ItemRecorded>> {
        self.record_outcome(item, Outcome::Failed(error), duration_seconds)
            .await
    }

    async fn record_outcome(
        &self,
        item: &ItemRow,
        outcome: Outcome<'_>,
        duration_seconds: Option<f64>,
    ) -> Result<Option<ItemRecorded>> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(query_failed("begin item outcome"))?;

        let updated = match &outcome {
            Outcome::Completed(article) => sqlx::query(
                r#"
                UPDATE batch_articles
                SET status = ?, completed_at = ?, processing_duration_seconds = ?,
                    generated_title = ?, generated_content = ?, meta_description = ?,
                    actual_word_count = ?, error_message = NULL
                WHERE id = ? AND status = ?
                "#,
            )
            .bind(item_status::COMPLETED)
            .bind(now)
            .bind(duration_seconds)
            .bind(&article.title)
            .bind(&article.content)
            .bind(&article.meta_description)
            .bind(article.word_count)
            .bind(item.id)
            .bind(item_status::PROCESSING)
            .execute(&mut *tx)
            .await
            .map_err(query_failed("record completed item"))?,
            Outcome::Failed(error) => sqlx::query(
                r#"
                UPDATE batch_articles
                SET status = ?, completed_at = ?, processing_duration_seconds = ?,
                    error_message = ?
                WHERE id = ? AND status = ?
                "#,
            )
            .bind(item_status::FAILED)
            .bind(now)
            .bind(duration_seconds)
            .bind(*error)
            .bind(item.id)
            .bind(item_status::PROCESSING)
            .execute(&mut *tx)
            .await
            .map_err(query_failed("record failed item"))?,
        };

        if updated.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(query_failed("roll back item outcome"))?;
            return Ok(None);
        }

        let counter_sql = match &outcome {
            Outcome::Completed(_) => {
                "UPDATE article_batches SET completed_count = completed_count + 1 WHERE id = ?"
            }
            Outcome::Failed(_) => {
                "UPDATE article_batches SET failed_count = failed_count + 1 WHERE id = ?"
            }
        };
        sqlx::query(counter_sql)
            .bind(item.batch_id)
            .execute(&mut *tx)
            .await
            .map_err(query_failed("update batch counters"))?;

        match &outcome {
            Outcome::Completed(article) => {
                Self::write_log(
                    &mut tx,
                    item.batch_id,
                    Some(item.id),
                    LogLevel::Info,
                    "Article status changed to completed",
                    &serde_json::json!({
                        "word_count": article.word_count,
                        "duration_seconds": duration_seconds,
                    }),
                )
                .await?
            }
            Outcome::Failed(error) => {
                Self::write_log(
                    &mut tx,
                    item.batch_id,
                    Some(item.id),
                    LogLevel::Error,
                    "Article status changed to failed",
                    &serde_json::json!({ "error": error }),
                )
                .await?
            }
        }

        let batch_completed = Self::finalize_on(&mut tx, item.batch_id).await?;
        let (completed_count, failed_count) = Self::read_counters(&mut tx, item.batch_id).await?;

        tx.commit()
            .await
            .map_err(query_failed("commit item outcome"))?;

        Ok(Some(ItemRecorded {
            completed_count,
            failed_count,
            batch_completed,
        }))
    }

    async fn read_counters(conn: &mut SqliteConnection, batch_row_id: i64) -> Result<(i64, i64)> {
        let counters: (i64, i64) = sqlx::query_as(
            "SELECT completed_count, failed_count FROM article_batches WHERE id = ?",
        )
        .bind(batch_row_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(query_failed("read batch counters"))?;
        Ok(counters)
    }

    /// Items left `processing` by a previous run that never finished them
    pub async fn stranded_items(&self) -> Result<Vec<ItemRow>> {
        let rows = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM batch_articles WHERE status = ? ORDER BY batch_id, order_index"
        ))
        .bind(item_status::PROCESSING)
        .fetch_all(&self.pool)
        .await
        .map_err(query_failed("list stranded items"))?;

        Ok(rows)
    }

    /// Number of items of a batch in the given status
    pub async fn count_items_with_status(&self, batch_row_id: i64, status: i32) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM batch_articles WHERE batch_id = ? AND status = ?",
        )
        .bind(batch_row_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await
        .map_err(query_failed("count batch items"))?;

        Ok(count)
    }
}
