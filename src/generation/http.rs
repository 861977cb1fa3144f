//! HTTP JSON client for the content generation service.

use crate::config::GenerationConfig;
use crate::{Error, Result};
use serde::Deserialize;

use super::{ArticleGenerator, GeneratedArticle, GenerationRequest, parse_generated_content};

/// Longest slice of an error response body kept in the failure message
const ERROR_BODY_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    content: Option<String>,
}

/// Production [`ArticleGenerator`] that POSTs each request to an HTTP endpoint
///
/// The endpoint receives the [`GenerationRequest`] as JSON and answers with
/// `{"content": "<markdown>"}`.
pub struct HttpArticleGenerator {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpArticleGenerator {
    /// Build a client from the generation settings
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("article-batch/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait::async_trait]
impl ArticleGenerator for HttpArticleGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedArticle> {
        let mut http_request = self.client.post(&self.endpoint).json(request);
        if let Some(key) = &self.api_key {
            http_request = http_request.bearer_auth(key);
        }

        let response = http_request.send().await.map_err(|e| {
            let message = if e.is_timeout() {
                format!("Generation request for '{}' timed out", request.topic)
            } else if e.is_connect() {
                format!("Connection to generation service failed: {}", e)
            } else {
                format!("Generation request failed: {}", e)
            };
            Error::Generation(message)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let preview: String = body.chars().take(ERROR_BODY_PREVIEW_CHARS).collect();
            return Err(Error::Generation(format!(
                "Generation service returned {}: {}",
                status,
                preview.trim()
            )));
        }

        let body: GenerationResponse = response.json().await.map_err(|e| {
            Error::Generation(format!("Invalid response from generation service: {}", e))
        })?;

        tracing::debug!(
            topic = %request.topic,
            content_len = body.content.as_deref().map(str::len).unwrap_or(0),
            "generation service responded"
        );

        parse_generated_content(body.content.as_deref().unwrap_or_default())
    }
}
