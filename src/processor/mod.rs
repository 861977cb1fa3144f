//! Batch processor split into focused submodules.
//!
//! The `BatchProcessor` struct and its methods are organized by domain:
//! - [`assembler`] - Validation and atomic creation of batches
//! - [`queue_processor`] - The sequential worker loop
//! - [`control`] - Cancellation
//! - [`queries`] - Status, listing and log reads with ownership checks
//! - [`stream`] - Polling status stream for one batch
//! - [`lifecycle`] - Startup recovery and shutdown coordination

mod assembler;
mod control;
mod lifecycle;
mod queries;
mod queue_processor;
mod stream;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use stream::StatusStreamEvent;

use crate::config::Config;
use crate::db::Database;
use crate::error::Result;
use crate::generation::{ArticleGenerator, HttpArticleGenerator};
use crate::types::{CurrentItem, Event};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// Buffer size of the process-wide event channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// What the worker is doing right now, for the status stream
#[derive(Clone, Debug)]
pub(crate) struct CurrentWork {
    /// Row id of the batch being drained
    pub(crate) batch_row_id: i64,
    /// Item whose generation is in flight
    pub(crate) item: Option<CurrentItem>,
}

/// Worker lifecycle state
#[derive(Clone)]
pub(crate) struct WorkerState {
    /// Fired once on shutdown; the worker stops at its next suspension point
    pub(crate) shutdown: tokio_util::sync::CancellationToken,
    /// Tracks the worker task so shutdown can wait for the in-flight item
    pub(crate) tasks: tokio_util::task::TaskTracker,
    /// Batch and item currently being worked
    pub(crate) current: Arc<tokio::sync::RwLock<Option<CurrentWork>>>,
    /// Whether new batches are accepted (false during shutdown)
    pub(crate) accepting_new: Arc<AtomicBool>,
}

/// Main processor instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct BatchProcessor {
    /// Database instance for persistence
    /// Public for integration tests to inspect stored state
    pub db: Arc<Database>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Configuration
    pub(crate) config: Arc<Config>,
    /// Content generation client
    pub(crate) generator: Arc<dyn ArticleGenerator>,
    /// Worker lifecycle state
    pub(crate) worker: WorkerState,
}

impl BatchProcessor {
    /// Create a processor that generates articles over HTTP
    ///
    /// Opens (or creates) the database, runs migrations and records the
    /// start for unclean-shutdown detection. The worker is not started; call
    /// [`start_queue_processor`](Self::start_queue_processor).
    pub async fn new(config: Config) -> Result<Self> {
        let generator = HttpArticleGenerator::new(&config.generation)?;
        Self::with_generator(config, Arc::new(generator)).await
    }

    /// Create a processor with a custom generation client
    pub async fn with_generator(
        config: Config,
        generator: Arc<dyn ArticleGenerator>,
    ) -> Result<Self> {
        config.validate()?;

        let db = Database::new(&config.persistence.database_path).await?;

        if db.was_unclean_shutdown().await? {
            tracing::warn!(
                "Previous session did not shut down cleanly; interrupted batches will be resumed"
            );
        }

        // Mark that we're starting up (for unclean shutdown detection)
        db.set_clean_start().await?;

        let (event_tx, _rx) = tokio::sync::broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let worker = WorkerState {
            shutdown: tokio_util::sync::CancellationToken::new(),
            tasks: tokio_util::task::TaskTracker::new(),
            current: Arc::new(tokio::sync::RwLock::new(None)),
            accepting_new: Arc::new(AtomicBool::new(true)),
        };

        let processor = Self {
            db: Arc::new(db),
            event_tx,
            config: Arc::new(config),
            generator,
            worker,
        };

        if processor.config.worker.reclaim_stranded_on_start {
            processor.reclaim_stranded_items().await?;
        }

        Ok(processor)
    }

    /// Subscribe to processing events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events independently.
    /// A subscriber that falls behind by more than 1000 events receives
    /// `RecvError::Lagged`.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Emit an event to all subscribers
    ///
    /// If there are no active subscribers, the event is silently dropped.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Item the worker is generating for this batch, if any
    pub(crate) async fn current_item_for(&self, batch_row_id: i64) -> Option<CurrentItem> {
        let current = self.worker.current.read().await;
        current
            .as_ref()
            .filter(|work| work.batch_row_id == batch_row_id)
            .and_then(|work| work.item.clone())
    }

    pub(crate) async fn set_current(&self, work: Option<CurrentWork>) {
        *self.worker.current.write().await = work;
    }

    /// Spawn the REST API server in a background task
    ///
    /// Listens on the configured bind address (default: 127.0.0.1:8080).
    pub fn spawn_api_server(self: &Arc<Self>) -> tokio::task::JoinHandle<Result<()>> {
        let processor = self.clone();
        let config = self.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(processor, config).await })
    }
}
