//! Configuration types for article-batch

use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// Main configuration for [`BatchProcessor`](crate::BatchProcessor)
///
/// Every field has a default, so an empty JSON object (`{}`) is a valid
/// configuration for local development.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Data storage
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Queue worker pacing and limits
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Batch status stream settings
    #[serde(default)]
    pub stream: StreamConfig,

    /// Content generation service
    #[serde(default)]
    pub generation: GenerationConfig,

    /// API server
    #[serde(default)]
    pub server: ServerIntegrationConfig,
}

impl Config {
    /// Read a JSON configuration file
    ///
    /// Missing fields take their defaults. The result is validated.
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| crate::Error::Config {
            message: format!("failed to read {}: {}", path.display(), e),
            key: None,
        })?;
        let config: Config = serde_json::from_str(&raw).map_err(|e| crate::Error::Config {
            message: format!("invalid configuration in {}: {}", path.display(), e),
            key: None,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check settings that serde cannot express
    pub fn validate(&self) -> crate::Result<()> {
        if self.worker.max_items_per_batch == 0 {
            return Err(crate::Error::Config {
                message: "max_items_per_batch must be at least 1".to_string(),
                key: Some("worker.max_items_per_batch".to_string()),
            });
        }
        if self.stream.poll_interval.is_zero() {
            return Err(crate::Error::Config {
                message: "stream poll interval must be greater than zero".to_string(),
                key: Some("stream.poll_interval".to_string()),
            });
        }
        if self.generation.endpoint.trim().is_empty() {
            return Err(crate::Error::Config {
                message: "generation endpoint must not be empty".to_string(),
                key: Some("generation.endpoint".to_string()),
            });
        }
        Ok(())
    }
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PersistenceConfig {
    /// Database path (default: "article-batch.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Queue worker configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct WorkerConfig {
    /// Sleep between scans when no batch is runnable, in seconds (default: 10)
    #[serde(default = "default_idle_poll_interval", with = "duration_serde")]
    #[schema(value_type = f64)]
    pub idle_poll_interval: Duration,

    /// Pause between two items of a batch, in seconds (default: 2)
    ///
    /// Keeps the generation service from being hammered back to back.
    #[serde(default = "default_item_delay", with = "duration_serde")]
    #[schema(value_type = f64)]
    pub item_delay: Duration,

    /// Maximum number of items accepted in one batch (default: 100)
    #[serde(default = "default_max_items_per_batch")]
    pub max_items_per_batch: usize,

    /// On startup, mark items stranded in `processing` by a crash as failed (default: false)
    #[serde(default)]
    pub reclaim_stranded_on_start: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            idle_poll_interval: default_idle_poll_interval(),
            item_delay: default_item_delay(),
            max_items_per_batch: default_max_items_per_batch(),
            reclaim_stranded_on_start: false,
        }
    }
}

/// Batch status stream configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct StreamConfig {
    /// Interval between store re-reads, in seconds (default: 2)
    #[serde(default = "default_stream_poll_interval", with = "duration_serde")]
    #[schema(value_type = f64)]
    pub poll_interval: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_stream_poll_interval(),
        }
    }
}

/// Content generation service configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct GenerationConfig {
    /// URL the generation request is POSTed to (default: "http://localhost:2024/generate")
    #[serde(default = "default_generation_endpoint")]
    pub endpoint: String,

    /// Optional bearer token sent with every request
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-request timeout in seconds (None = wait indefinitely)
    #[serde(default, with = "optional_duration_serde")]
    #[schema(value_type = Option<f64>)]
    pub request_timeout: Option<Duration>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: default_generation_endpoint(),
            api_key: None,
            request_timeout: None,
        }
    }
}

/// API and external server integration configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:8080)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            swagger_ui: true,
        }
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from("article-batch.db")
}

fn default_idle_poll_interval() -> Duration {
    Duration::from_secs(10)
}

fn default_item_delay() -> Duration {
    Duration::from_secs(2)
}

fn default_max_items_per_batch() -> usize {
    100
}

fn default_stream_poll_interval() -> Duration {
    Duration::from_secs(2)
}

fn default_generation_endpoint() -> String {
    "http://localhost:2024/generate".to_string()
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_true() -> bool {
    true
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

// Optional Duration serialization helper
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs_f64()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<f64>::deserialize(deserializer)?;
        secs.map(Duration::try_from_secs_f64)
            .transpose()
            .map_err(serde::de::Error::custom)
    }
}
