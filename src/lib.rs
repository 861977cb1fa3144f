//! # article-batch
//!
//! Backend for bulk article generation: clients submit a batch of topics, a
//! single background worker generates the articles one at a time through an
//! external content service, and progress is persisted in SQLite so that a
//! restart picks up where the previous run stopped.
//!
//! ## Quick Start
//!
//! ```no_run
//! use article_batch::{BatchProcessor, Config, ItemSpec, NewBatchRequest};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let processor = Arc::new(BatchProcessor::new(Config::default()).await?);
//!
//!     // Subscribe to events
//!     let mut events = processor.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     processor.start_queue_processor();
//!     processor
//!         .create_batch(NewBatchRequest {
//!             name: "Garden posts".to_string(),
//!             items: vec![ItemSpec {
//!                 topic: "Composting at home".to_string(),
//!                 ..Default::default()
//!             }],
//!             ..Default::default()
//!         })
//!         .await?;
//!
//!     article_batch::run_with_shutdown(&processor).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Database persistence layer
pub mod db;
/// Error types
pub mod error;
/// Content generation client
pub mod generation;
/// Batch queue, worker and control operations
pub mod processor;
/// Database rows to API views
pub mod projection;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use db::Database;
pub use error::{ApiError, BatchError, DatabaseError, Error, ErrorDetail, Result, ToHttpStatus};
pub use generation::{ArticleGenerator, GeneratedArticle, GenerationRequest, HttpArticleGenerator};
pub use processor::{BatchProcessor, StatusStreamEvent};
pub use types::{
    BatchCreated, BatchId, BatchInfo, BatchStatus, BatchStatusUpdate, BatchSummary, CancelResult,
    Event, ItemInfo, ItemSpec, ItemStatus, LogEntry, NewBatchRequest, Tone,
};

/// Helper function to run the processor with graceful signal handling.
///
/// Waits for a termination signal or a `POST /shutdown` request, then calls
/// the processor's `shutdown()` method.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
pub async fn run_with_shutdown(processor: &BatchProcessor) -> Result<()> {
    tokio::select! {
        _ = wait_for_signal() => {}
        _ = processor.shutdown_requested() => {
            tracing::info!("Shutdown requested through the API");
        }
    }
    processor.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
