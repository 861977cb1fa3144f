//! Batch control: cancellation.

use crate::error::{BatchError, Result};
use crate::types::{BatchId, BatchStatus, CancelResult, Event};

use super::BatchProcessor;

impl BatchProcessor {
    /// Cancel a pending or processing batch
    ///
    /// Every queued item becomes `skipped`. An item whose generation is
    /// already in flight is not interrupted: it finishes, is recorded, and
    /// counts toward the batch counters, but the batch stays `cancelled`.
    ///
    /// # Errors
    ///
    /// - [`BatchError::NotFound`] if no such batch exists
    /// - [`BatchError::Unauthorized`] if `owner` does not own it
    /// - [`BatchError::InvalidState`] if it is already completed, failed or cancelled
    pub async fn cancel_batch(&self, batch_id: &BatchId, owner: &str) -> Result<CancelResult> {
        let batch = self.owned_batch(batch_id, owner).await?;

        let status = BatchStatus::from_i32(batch.status);
        if status.is_terminal() {
            return Err(invalid_cancel(batch_id, status));
        }

        let Some(cancelled) = self.db.cancel_batch(batch.id, owner).await? else {
            // Lost a race with the worker finishing or another cancel
            let current = self
                .db
                .get_batch_by_row_id(batch.id)
                .await?
                .map(|row| BatchStatus::from_i32(row.status))
                .unwrap_or(status);
            return Err(invalid_cancel(batch_id, current));
        };

        tracing::info!(
            batch_id = %batch_id,
            owner = owner,
            skipped_items = cancelled.skipped_items,
            "Batch cancelled"
        );

        self.emit_event(Event::BatchCancelled {
            batch_id: batch_id.clone(),
            skipped_items: cancelled.skipped_items,
        });

        Ok(CancelResult {
            batch_id: cancelled.batch.batch_id,
            status: BatchStatus::from_i32(cancelled.batch.status),
            skipped_items: cancelled.skipped_items,
        })
    }
}

fn invalid_cancel(batch_id: &BatchId, status: BatchStatus) -> crate::Error {
    BatchError::InvalidState {
        batch_id: batch_id.to_string(),
        operation: "cancel".to_string(),
        current_state: status.to_string(),
    }
    .into()
}
