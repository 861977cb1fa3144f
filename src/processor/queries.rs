//! Read operations with ownership checks.

use crate::db::BatchRow;
use crate::error::{BatchError, Error, Result};
use crate::projection;
use crate::types::{BatchId, BatchInfo, BatchStatus, BatchSummary, LogEntry};

use super::BatchProcessor;

/// Largest page accepted by [`BatchProcessor::list_batches`]
pub const MAX_LIST_LIMIT: i64 = 100;
/// Largest page accepted by [`BatchProcessor::batch_logs`]
pub const MAX_LOG_LIMIT: i64 = 1000;

fn check_page(offset: i64, limit: i64, max: i64) -> Result<()> {
    if offset < 0 {
        return Err(Error::Validation(format!(
            "offset must not be negative, got {}",
            offset
        )));
    }
    if !(1..=max).contains(&limit) {
        return Err(Error::Validation(format!(
            "limit must be between 1 and {}, got {}",
            max, limit
        )));
    }
    Ok(())
}

impl BatchProcessor {
    /// Load a batch and check that `owner` may see it
    pub(crate) async fn owned_batch(&self, batch_id: &BatchId, owner: &str) -> Result<BatchRow> {
        let batch = self
            .db
            .get_batch(batch_id)
            .await?
            .ok_or_else(|| BatchError::NotFound {
                batch_id: batch_id.to_string(),
            })?;

        if batch.owner != owner {
            return Err(BatchError::Unauthorized {
                batch_id: batch_id.to_string(),
            }
            .into());
        }

        Ok(batch)
    }

    /// Full status of a batch, including every item in processing order
    pub async fn get_batch_status(&self, batch_id: &BatchId, owner: &str) -> Result<BatchInfo> {
        let batch = self.owned_batch(batch_id, owner).await?;
        let items = self.db.list_items(batch.id).await?;
        Ok(projection::batch_info(batch, items))
    }

    /// An owner's batches, newest first
    ///
    /// `limit` must be within 1..=100.
    pub async fn list_batches(
        &self,
        owner: &str,
        status: Option<BatchStatus>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<BatchSummary>> {
        check_page(offset, limit, MAX_LIST_LIMIT)?;

        let rows = self
            .db
            .list_batches(owner, status.map(|s| s.to_i32()), offset, limit)
            .await?;

        Ok(rows.into_iter().map(BatchSummary::from).collect())
    }

    /// Processing log of a batch, newest first
    ///
    /// `limit` must be within 1..=1000.
    pub async fn batch_logs(
        &self,
        batch_id: &BatchId,
        owner: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<LogEntry>> {
        check_page(offset, limit, MAX_LOG_LIMIT)?;

        let batch = self.owned_batch(batch_id, owner).await?;
        let rows = self.db.list_logs(batch.id, offset, limit).await?;

        Ok(rows.into_iter().map(LogEntry::from).collect())
    }
}
