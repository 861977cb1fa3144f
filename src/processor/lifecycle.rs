//! Startup recovery and graceful shutdown.

use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::error::Result;
use crate::types::Event;

use super::BatchProcessor;

/// How long shutdown waits for the in-flight item before giving up
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Failure reason recorded on items reclaimed at startup
pub(crate) const INTERRUPTED_BY_RESTART: &str = "interrupted by restart";

impl BatchProcessor {
    /// Gracefully shut down the processor
    ///
    /// 1. Stops accepting new batches
    /// 2. Signals the worker, which finishes and records its in-flight item
    /// 3. Waits up to 30 seconds for the worker to exit
    /// 4. Marks the shutdown as clean and emits [`Event::Shutdown`]
    ///
    /// Interrupted batches stay `processing` and are resumed on the next start.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        self.worker.accepting_new.store(false, Ordering::SeqCst);
        tracing::info!("Stopped accepting new batches");

        self.worker.shutdown.cancel();
        self.worker.tasks.close();

        match tokio::time::timeout(SHUTDOWN_TIMEOUT, self.worker.tasks.wait()).await {
            Ok(()) => tracing::info!("Queue worker stopped gracefully"),
            Err(_) => {
                tracing::warn!("Timeout waiting for the queue worker, proceeding with shutdown")
            }
        }

        if let Err(e) = self.db.set_clean_shutdown().await {
            tracing::error!(error = %e, "Failed to mark clean shutdown in database");
        } else {
            tracing::info!("Marked clean shutdown in database");
        }

        self.emit_event(Event::Shutdown);

        tracing::info!("Graceful shutdown complete");
        Ok(())
    }

    /// Resolves once [`shutdown`](Self::shutdown) has started
    ///
    /// Lets the hosting binary and the API server react to `POST /shutdown`.
    pub async fn shutdown_requested(&self) {
        self.worker.shutdown.cancelled().await
    }

    /// Fail items a previous run left `processing`
    ///
    /// Such items had a generation call in flight when the process died; the
    /// outcome is unknown, so they are recorded as failed rather than
    /// generated twice. Batches whose last item this was are completed.
    /// Returns the number of items reclaimed.
    pub async fn reclaim_stranded_items(&self) -> Result<u64> {
        let stranded = self.db.stranded_items().await?;
        let mut reclaimed = 0u64;

        for item in &stranded {
            let Some(recorded) = self.db.fail_item(item, INTERRUPTED_BY_RESTART, None).await?
            else {
                continue;
            };
            reclaimed += 1;

            tracing::warn!(
                item_id = item.id,
                order_index = item.order_index,
                "Reclaimed item interrupted by restart"
            );

            if recorded.batch_completed {
                tracing::info!(
                    item_id = item.id,
                    completed = recorded.completed_count,
                    failed = recorded.failed_count,
                    "Batch completed during reclaim"
                );
            }
        }

        if reclaimed > 0 {
            tracing::info!(reclaimed, "Stranded items reclaimed");
        }

        Ok(reclaimed)
    }
}
