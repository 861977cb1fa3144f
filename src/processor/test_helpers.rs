//! Shared test helpers for creating BatchProcessor instances in tests.

use crate::config::Config;
use crate::generation::{
    ArticleGenerator, GeneratedArticle, GenerationRequest, parse_generated_content,
};
use crate::processor::BatchProcessor;
use crate::types::{BatchId, BatchInfo, ItemSpec, NewBatchRequest};
use crate::{Error, Result};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;
use tokio::sync::Notify;

/// One scripted generator reply
#[derive(Clone, Debug)]
pub(crate) enum Reply {
    /// Return this markdown as the generated article
    Content(String),
    /// Fail with this generation error message
    Fail(String),
}

/// Lets a test hold the generator inside a call
#[derive(Default)]
pub(crate) struct Gate {
    /// Signalled each time a call starts
    pub(crate) entered: Notify,
    /// Must be signalled once per call to let it return
    pub(crate) release: Notify,
}

/// Generator that replays a script and records every request
///
/// Once the script runs out every call succeeds with an article titled after
/// the topic.
#[derive(Default)]
pub(crate) struct ScriptedGenerator {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<GenerationRequest>>,
    gate: Option<Arc<Gate>>,
}

impl ScriptedGenerator {
    pub(crate) fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Default::default()
        }
    }

    pub(crate) fn gated(replies: Vec<Reply>, gate: Arc<Gate>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::default(),
            gate: Some(gate),
        }
    }

    /// Topics requested so far, in call order
    pub(crate) fn topics(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.topic.clone())
            .collect()
    }

    pub(crate) fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ArticleGenerator for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedArticle> {
        self.requests.lock().unwrap().push(request.clone());
        let reply = self.replies.lock().unwrap().pop_front();

        if let Some(gate) = &self.gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        match reply {
            Some(Reply::Content(markdown)) => parse_generated_content(&markdown),
            Some(Reply::Fail(message)) => Err(Error::Generation(message)),
            None => parse_generated_content(&format!(
                "# {}\n\nA short article about {}.",
                request.topic, request.topic
            )),
        }
    }
}

/// Config pointing at a database inside `dir`, with fast timings
pub(crate) fn test_config(dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.persistence.database_path = dir.join("test.db");
    config.worker.idle_poll_interval = Duration::from_millis(20);
    config.worker.item_delay = Duration::ZERO;
    config.stream.poll_interval = Duration::from_millis(20);
    config
}

/// Helper to create a test BatchProcessor backed by a scripted generator.
/// Returns the processor, the generator and the tempdir (which must be kept alive).
pub(crate) async fn create_test_processor(
    generator: ScriptedGenerator,
) -> (BatchProcessor, Arc<ScriptedGenerator>, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let generator = Arc::new(generator);
    let processor =
        BatchProcessor::with_generator(test_config(temp_dir.path()), generator.clone())
            .await
            .unwrap();
    (processor, generator, temp_dir)
}

/// Batch request for `owner` with one item per topic
pub(crate) fn batch_request(owner: &str, topics: &[&str]) -> NewBatchRequest {
    NewBatchRequest {
        owner: owner.to_string(),
        name: format!("{} topics", topics.len()),
        items: topics
            .iter()
            .map(|topic| ItemSpec {
                topic: topic.to_string(),
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    }
}

/// Poll a batch until `done` holds for its status, or five seconds pass
pub(crate) async fn wait_for_batch<F>(
    processor: &BatchProcessor,
    batch_id: &BatchId,
    mut done: F,
) -> BatchInfo
where
    F: FnMut(&BatchInfo) -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let row = processor.db.get_batch(batch_id).await.unwrap().unwrap();
        let info = processor
            .get_batch_status(batch_id, &row.owner)
            .await
            .unwrap();
        if done(&info) {
            return info;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "batch {batch_id} did not reach the expected state: {info:?}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
