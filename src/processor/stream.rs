//! Polling status stream for a single batch.

use futures::Stream;

use crate::error::{ApiError, ErrorDetail};
use crate::projection;
use crate::types::{BatchId, BatchStatusUpdate};

use super::BatchProcessor;

/// One message on a batch status stream
#[derive(Clone, Debug)]
pub enum StatusStreamEvent {
    /// Batch status changed (the first message is always a status)
    Status(BatchStatusUpdate),
    /// The stream cannot continue; always the last message
    Error(ErrorDetail),
}

impl StatusStreamEvent {
    /// Event name used on the SSE wire
    pub fn name(&self) -> &'static str {
        match self {
            StatusStreamEvent::Status(_) => "status",
            StatusStreamEvent::Error(_) => "error",
        }
    }
}

/// (status, completed_count, failed_count) as last sent
type Snapshot = (i32, i64, i64);

struct StreamState {
    processor: BatchProcessor,
    batch_id: BatchId,
    owner: String,
    last: Option<Snapshot>,
    polled: bool,
    finished: bool,
}

impl BatchProcessor {
    /// Stream status updates for a batch until it reaches a terminal status
    ///
    /// The store is read immediately and then every `stream.poll_interval`.
    /// A status message is produced only when the status or one of the
    /// counters changed since the previous message; the message with
    /// `is_complete == true` is the last one. A missing batch or a foreign
    /// owner yields a single error message. Transient store errors are logged
    /// and polling continues. The stream also ends when the processor shuts
    /// down.
    pub fn status_stream(
        &self,
        batch_id: BatchId,
        owner: String,
    ) -> impl Stream<Item = StatusStreamEvent> + Send + use<> {
        let state = StreamState {
            processor: self.clone(),
            batch_id,
            owner,
            last: None,
            polled: false,
            finished: false,
        };

        futures::stream::unfold(state, |mut state| async move {
            if state.finished {
                return None;
            }

            let interval = state.processor.config.stream.poll_interval;

            loop {
                if state.polled {
                    tokio::select! {
                        _ = state.processor.worker.shutdown.cancelled() => return None,
                        _ = tokio::time::sleep(interval) => {}
                    }
                }
                state.polled = true;

                let row = match state.processor.db.get_batch(&state.batch_id).await {
                    Ok(Some(row)) => row,
                    Ok(None) => {
                        state.finished = true;
                        let detail =
                            ApiError::not_found(format!("batch {}", state.batch_id)).error;
                        return Some((StatusStreamEvent::Error(detail), state));
                    }
                    Err(e) => {
                        tracing::warn!(
                            batch_id = %state.batch_id,
                            error = %e,
                            "Status stream read failed, retrying"
                        );
                        continue;
                    }
                };

                if row.owner != state.owner {
                    state.finished = true;
                    let detail = ApiError::new(
                        "unauthorized",
                        format!("not authorized to access batch {}", state.batch_id),
                    )
                    .error;
                    return Some((StatusStreamEvent::Error(detail), state));
                }

                let snapshot = (row.status, row.completed_count, row.failed_count);
                if state.last == Some(snapshot) {
                    continue;
                }
                state.last = Some(snapshot);

                let current = state.processor.current_item_for(row.id).await;
                let update = projection::status_update(&row, current);
                if update.is_complete {
                    state.finished = true;
                }
                return Some((StatusStreamEvent::Status(update), state));
            }
        })
    }
}
