//! Common test utilities for article-batch end-to-end tests

#![allow(dead_code)]

use article_batch::{BatchId, BatchProcessor, Config, Event};
use std::path::Path;
use std::time::Duration;
use tokio::sync::broadcast::Receiver;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Config with its database inside `dir`, generating against `server`
pub fn test_config(dir: &Path, server: &MockServer) -> Config {
    let mut config = Config::default();
    config.persistence.database_path = dir.join("batches.db");
    config.generation.endpoint = format!("{}/generate", server.uri());
    config.generation.request_timeout = Some(Duration::from_secs(5));
    config.worker.idle_poll_interval = Duration::from_millis(20);
    config.worker.item_delay = Duration::ZERO;
    config.stream.poll_interval = Duration::from_millis(20);
    config
}

/// Answer generation requests for `topic` with a short article
pub async fn mount_article(server: &MockServer, topic: &str, body: &str) {
    Mock::given(method("POST"))
        .and(path("/generate"))
        .and(body_partial_json(serde_json::json!({ "topic": topic })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "content": format!("# {topic}\n\n{body}")
        })))
        .mount(server)
        .await;
}

/// Answer generation requests for `topic` with an HTTP error
pub async fn mount_failure(server: &MockServer, topic: &str, status: u16) {
    Mock::given(method("POST"))
        .and(path("/generate"))
        .and(body_partial_json(serde_json::json!({ "topic": topic })))
        .respond_with(ResponseTemplate::new(status).set_body_string("model overloaded"))
        .mount(server)
        .await;
}

/// Result of waiting for a batch to finish
#[derive(Debug, PartialEq)]
pub enum WaitResult {
    /// Every item reached a terminal state
    Completed { completed: i64, failed: i64 },
    /// The worker gave up on the batch
    Failed(String),
    /// Timeout waiting for completion
    Timeout,
    /// Channel closed unexpectedly
    ChannelClosed,
}

/// Wait for `batch_id` to complete or fail
///
/// `events` must be subscribed before the worker starts.
pub async fn wait_for_completion(
    events: &mut Receiver<Event>,
    batch_id: &BatchId,
    timeout: Duration,
) -> WaitResult {
    let result = tokio::time::timeout(timeout, async {
        loop {
            match events.recv().await {
                Ok(Event::BatchCompleted {
                    batch_id: id,
                    completed_count,
                    failed_count,
                }) if &id == batch_id => {
                    return WaitResult::Completed {
                        completed: completed_count,
                        failed: failed_count,
                    };
                }
                Ok(Event::BatchFailed { batch_id: id, error }) if &id == batch_id => {
                    return WaitResult::Failed(error);
                }
                Ok(_) => continue,
                Err(_) => return WaitResult::ChannelClosed,
            }
        }
    })
    .await;

    result.unwrap_or(WaitResult::Timeout)
}

/// Open a processor on `config` and start its worker
pub async fn start_processor(config: Config) -> BatchProcessor {
    let processor = BatchProcessor::new(config)
        .await
        .unwrap_or_else(|e| panic!("processor failed to start: {e}"));
    processor.start_queue_processor();
    processor
}
