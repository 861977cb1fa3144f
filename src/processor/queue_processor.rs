//! Queue worker: drains batches one at a time, items in order.

use std::time::{Duration, Instant};

use crate::db::{BatchRow, batch_status};
use crate::error::Result;
use crate::generation::{GenerationRequest, failure_message};
use crate::types::{CurrentItem, Event};

use super::{BatchProcessor, CurrentWork};

impl BatchProcessor {
    /// Start the queue worker task
    ///
    /// The worker runs until [`shutdown`](Self::shutdown) and repeatedly:
    /// 1. Picks the next runnable batch (an interrupted `processing` batch
    ///    first, otherwise the oldest `pending` one)
    /// 2. Claims it and works its queued items in `order_index` order, one
    ///    generation call at a time
    /// 3. Sleeps `worker.idle_poll_interval` when nothing is runnable
    ///
    /// Shutdown is observed between items and during sleeps; an in-flight
    /// generation call is always allowed to finish and be recorded.
    pub fn start_queue_processor(&self) -> tokio::task::JoinHandle<()> {
        let processor = self.clone();
        self.worker
            .tasks
            .spawn(async move { processor.run_worker_loop().await })
    }

    async fn run_worker_loop(&self) {
        tracing::info!("Queue worker started");
        let idle = self.config.worker.idle_poll_interval;

        while !self.worker.shutdown.is_cancelled() {
            match self.db.next_runnable_batch().await {
                Ok(Some(batch)) => self.run_batch(batch).await,
                Ok(None) => {
                    if !self.pause(idle).await {
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to look up next runnable batch");
                    if !self.pause(idle).await {
                        break;
                    }
                }
            }
        }

        tracing::info!("Queue worker stopped");
    }

    /// Sleep for `duration` unless shutdown fires first
    ///
    /// Returns false if shutdown was requested.
    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.worker.shutdown.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }

    /// Run one batch, turning any worker-level error into a failed batch
    async fn run_batch(&self, batch: BatchRow) {
        let batch_id = batch.batch_id.clone();
        let row_id = batch.id;

        if let Err(e) = self.process_batch(batch).await {
            let error = e.to_string();
            tracing::error!(batch_id = %batch_id, error = %error, "Batch processing failed");

            match self.db.mark_batch_failed(row_id, &error).await {
                Ok(true) => self.emit_event(Event::BatchFailed { batch_id, error }),
                Ok(false) => {
                    tracing::debug!(batch_id = %batch_id, "Batch already terminal, not marking failed")
                }
                Err(db_err) => {
                    tracing::error!(batch_id = %batch_id, error = %db_err, "Failed to mark batch failed")
                }
            }
        }

        self.set_current(None).await;
    }

    async fn process_batch(&self, batch: BatchRow) -> Result<()> {
        if batch.status == batch_status::PENDING {
            if !self.db.claim_batch(batch.id).await? {
                tracing::info!(batch_id = %batch.batch_id, "Batch no longer pending, skipping");
                return Ok(());
            }
            tracing::info!(
                batch_id = %batch.batch_id,
                total_items = batch.total_items,
                "Batch processing started"
            );
            self.emit_event(Event::BatchStarted {
                batch_id: batch.batch_id.clone(),
            });
        } else {
            tracing::info!(
                batch_id = %batch.batch_id,
                completed = batch.completed_count,
                failed = batch.failed_count,
                "Resuming interrupted batch"
            );
        }

        self.set_current(Some(CurrentWork {
            batch_row_id: batch.id,
            item: None,
        }))
        .await;

        let item_delay = self.config.worker.item_delay;

        while !self.worker.shutdown.is_cancelled() {
            let Some(item) = self.db.next_queued_item(batch.id).await? else {
                break;
            };

            if !self.db.claim_item(&item).await? {
                tracing::debug!(item_id = item.id, "Item claim lost, moving on");
                continue;
            }

            self.emit_event(Event::ItemStarted {
                batch_id: batch.batch_id.clone(),
                item_id: item.id,
                order_index: item.order_index,
            });
            self.set_current(Some(CurrentWork {
                batch_row_id: batch.id,
                item: Some(CurrentItem {
                    id: item.id,
                    topic: item.topic.clone(),
                }),
            }))
            .await;

            tracing::info!(
                batch_id = %batch.batch_id,
                item_id = item.id,
                order_index = item.order_index,
                topic = %item.topic,
                "Generating article"
            );

            let request = GenerationRequest::from(&item);
            let started = Instant::now();
            let outcome = self.generator.generate(&request).await;
            let elapsed = started.elapsed().as_secs_f64();

            let recorded = match outcome {
                Ok(article) => {
                    let recorded = self.db.complete_item(&item, &article, elapsed).await?;
                    if recorded.is_some() {
                        tracing::info!(
                            item_id = item.id,
                            word_count = article.word_count,
                            duration_secs = elapsed,
                            "Article completed"
                        );
                        self.emit_event(Event::ItemCompleted {
                            batch_id: batch.batch_id.clone(),
                            item_id: item.id,
                            word_count: article.word_count,
                        });
                    }
                    recorded
                }
                Err(e) => {
                    let error = failure_message(&e);
                    let recorded = self.db.fail_item(&item, &error, Some(elapsed)).await?;
                    if recorded.is_some() {
                        tracing::warn!(item_id = item.id, error = %error, "Article failed");
                        self.emit_event(Event::ItemFailed {
                            batch_id: batch.batch_id.clone(),
                            item_id: item.id,
                            error,
                        });
                    }
                    recorded
                }
            };

            self.set_current(Some(CurrentWork {
                batch_row_id: batch.id,
                item: None,
            }))
            .await;

            match recorded {
                Some(counters) if counters.batch_completed => {
                    self.announce_completion(&batch, counters.completed_count, counters.failed_count);
                }
                Some(_) => {}
                None => {
                    tracing::warn!(item_id = item.id, "Item was no longer processing, outcome dropped")
                }
            }

            self.pause(item_delay).await;
        }

        // Resumed batches can have every item terminal already
        if self.db.finalize_if_done(batch.id).await?
            && let Some(row) = self.db.get_batch_by_row_id(batch.id).await?
        {
            self.announce_completion(&batch, row.completed_count, row.failed_count);
        }

        Ok(())
    }

    fn announce_completion(&self, batch: &BatchRow, completed_count: i64, failed_count: i64) {
        tracing::info!(
            batch_id = %batch.batch_id,
            completed = completed_count,
            failed = failed_count,
            "Batch completed"
        );
        self.emit_event(Event::BatchCompleted {
            batch_id: batch.batch_id.clone(),
            completed_count,
            failed_count,
        });
    }
}
