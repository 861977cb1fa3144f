//! Core types for article-batch

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;

/// Public identifier of a batch (e.g. `batch_1a2b3c4d_20260301`)
///
/// Distinct from the internal integer row id, which never leaves the store.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct BatchId(pub String);

impl BatchId {
    /// Generate a fresh identifier: random component plus the creation date
    pub fn generate() -> Self {
        let random: u32 = rand::random();
        Self(format!(
            "batch_{:08x}_{}",
            random,
            Utc::now().format("%Y%m%d")
        ))
    }

    /// Borrow the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for BatchId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for BatchId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl sqlx::Type<sqlx::Sqlite> for BatchId {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <String as sqlx::Type<sqlx::Sqlite>>::type_info()
    }

    fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for BatchId {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        sqlx::Encode::<sqlx::Sqlite>::encode_by_ref(&self.0, buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for BatchId {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let id = <String as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        Ok(Self(id))
    }
}

/// Batch lifecycle status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    /// Waiting for the worker
    Pending,
    /// Items are being worked
    Processing,
    /// Every item reached a terminal state (some may have failed)
    Completed,
    /// The worker itself failed while orchestrating the batch
    Failed,
    /// Cancelled by its owner
    Cancelled,
}

impl BatchStatus {
    /// Convert integer status code to BatchStatus
    pub fn from_i32(status: i32) -> Self {
        match status {
            0 => BatchStatus::Pending,
            1 => BatchStatus::Processing,
            2 => BatchStatus::Completed,
            3 => BatchStatus::Failed,
            4 => BatchStatus::Cancelled,
            _ => BatchStatus::Failed, // Unknown codes are treated as failed
        }
    }

    /// Convert BatchStatus to its integer status code
    pub fn to_i32(&self) -> i32 {
        match self {
            BatchStatus::Pending => 0,
            BatchStatus::Processing => 1,
            BatchStatus::Completed => 2,
            BatchStatus::Failed => 3,
            BatchStatus::Cancelled => 4,
        }
    }

    /// Whether no further transition can happen from this status
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BatchStatus::Completed | BatchStatus::Failed | BatchStatus::Cancelled
        )
    }

    /// Lowercase name as used in the JSON API
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Pending => "pending",
            BatchStatus::Processing => "processing",
            BatchStatus::Completed => "completed",
            BatchStatus::Failed => "failed",
            BatchStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BatchStatus::Pending),
            "processing" => Ok(BatchStatus::Processing),
            "completed" => Ok(BatchStatus::Completed),
            "failed" => Ok(BatchStatus::Failed),
            "cancelled" => Ok(BatchStatus::Cancelled),
            other => Err(format!("unknown batch status '{}'", other)),
        }
    }
}

/// Item (single article) lifecycle status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    /// Waiting to be claimed
    Queued,
    /// Claimed by the worker, generation in flight
    Processing,
    /// Generated successfully
    Completed,
    /// Generation failed
    Failed,
    /// Never started because the batch was cancelled
    Skipped,
}

impl ItemStatus {
    /// Convert integer status code to ItemStatus
    pub fn from_i32(status: i32) -> Self {
        match status {
            0 => ItemStatus::Queued,
            1 => ItemStatus::Processing,
            2 => ItemStatus::Completed,
            3 => ItemStatus::Failed,
            4 => ItemStatus::Skipped,
            _ => ItemStatus::Failed,
        }
    }

    /// Convert ItemStatus to its integer status code
    pub fn to_i32(&self) -> i32 {
        match self {
            ItemStatus::Queued => 0,
            ItemStatus::Processing => 1,
            ItemStatus::Completed => 2,
            ItemStatus::Failed => 3,
            ItemStatus::Skipped => 4,
        }
    }

    /// Whether no further transition can happen from this status
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ItemStatus::Completed | ItemStatus::Failed | ItemStatus::Skipped
        )
    }
}

/// Writing tone requested for an article
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    /// Neutral business register
    #[default]
    Professional,
    /// Conversational
    Casual,
    /// Scholarly
    Academic,
    /// Subject-matter expert voice
    Expert,
}

impl Tone {
    /// Lowercase name as stored and sent to the generator
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Professional => "professional",
            Tone::Casual => "casual",
            Tone::Academic => "academic",
            Tone::Expert => "expert",
        }
    }

    /// Parse a stored tone, falling back to professional
    pub fn from_str_lossy(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "casual" => Tone::Casual,
            "academic" => Tone::Academic,
            "expert" => Tone::Expert,
            _ => Tone::Professional,
        }
    }
}

/// Severity of a processing log entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Normal transition
    Info,
    /// User-initiated interruption (cancel) or recovery
    Warning,
    /// Failure
    Error,
}

impl LogLevel {
    /// Uppercase name as stored in the log table
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }
}

/// Specification of one article to generate, as submitted by a client
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ItemSpec {
    /// Article topic (required, non-empty)
    pub topic: String,

    /// Comma-separated keywords
    #[serde(default)]
    pub keywords: Option<String>,

    /// Writing tone (default: professional)
    #[serde(default)]
    pub tone: Option<Tone>,

    /// Target length in words (default: 1000)
    #[serde(default)]
    pub word_count: Option<i64>,

    /// Persona override for the writer
    #[serde(default)]
    pub custom_persona: Option<String>,

    /// Number of reference links to include (default: 5)
    #[serde(default)]
    pub link_count: Option<i64>,

    /// Place links inline in the text (default: true)
    #[serde(default)]
    pub use_inline_links: Option<bool>,

    /// Use APA citation style (default: false)
    #[serde(default)]
    pub use_apa_style: Option<bool>,

    /// Any additional columns carried along with the item
    #[serde(default)]
    #[schema(value_type = Object)]
    pub extra_fields: Option<HashMap<String, serde_json::Value>>,
}

/// Request to create a batch
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct NewBatchRequest {
    /// Owner of the batch (default: "default_user")
    #[serde(default = "default_owner")]
    pub owner: String,

    /// Display name
    pub name: String,

    /// Optional free-form description
    #[serde(default)]
    pub description: Option<String>,

    /// Name of the uploaded file the items came from
    #[serde(default)]
    pub source_filename: Option<String>,

    /// Opaque default settings stored with the batch
    #[serde(default)]
    #[schema(value_type = Object)]
    pub default_config: Option<serde_json::Value>,

    /// Articles to generate, in processing order
    pub items: Vec<ItemSpec>,
}

/// Default owner used when a request does not name one
pub fn default_owner() -> String {
    "default_user".to_string()
}

/// Response to a successful batch creation
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct BatchCreated {
    /// Public batch identifier
    pub batch_id: BatchId,
    /// Initial status (always pending)
    pub status: BatchStatus,
    /// Number of items in the batch
    pub total_items: i64,
}

/// Response to a successful cancellation
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CancelResult {
    /// Public batch identifier
    pub batch_id: BatchId,
    /// Status after the cancellation (always cancelled)
    pub status: BatchStatus,
    /// Number of queued items moved to skipped
    pub skipped_items: u64,
}

/// Per-item entry in a batch status response
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ItemInfo {
    /// Item id
    pub id: i64,
    /// Position within the batch (0-based)
    pub order_index: i64,
    /// Article topic
    pub topic: String,
    /// Current status
    pub status: ItemStatus,
    /// Failure reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Words in the generated article
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_count: Option<i64>,
    /// Processing time in minutes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_minutes: Option<f64>,
}

/// Full status of a batch including its items
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct BatchInfo {
    /// Public batch identifier
    pub batch_id: BatchId,
    /// Display name
    pub name: String,
    /// Optional description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Current status
    pub status: BatchStatus,
    /// Number of items
    pub total_items: i64,
    /// Items completed successfully
    pub completed_count: i64,
    /// Items that failed
    pub failed_count: i64,
    /// Share of items in a finished state (0.0 to 100.0)
    pub progress_percentage: f64,
    /// Whether the batch reached a terminal status
    pub is_complete: bool,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// When the worker claimed the batch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// When the batch reached a terminal status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Worker-level failure reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Items in processing order
    pub items: Vec<ItemInfo>,
}

/// Batch entry in a listing (no items)
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct BatchSummary {
    /// Public batch identifier
    pub batch_id: BatchId,
    /// Display name
    pub name: String,
    /// Current status
    pub status: BatchStatus,
    /// Number of items
    pub total_items: i64,
    /// Items completed successfully
    pub completed_count: i64,
    /// Items that failed
    pub failed_count: i64,
    /// Share of items in a finished state (0.0 to 100.0)
    pub progress_percentage: f64,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// When the batch reached a terminal status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Item the worker is currently generating
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CurrentItem {
    /// Item id
    pub id: i64,
    /// Article topic
    pub topic: String,
}

/// One event on a batch status stream
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct BatchStatusUpdate {
    /// Public batch identifier
    pub batch_id: BatchId,
    /// Current status
    pub status: BatchStatus,
    /// Number of items
    pub total_items: i64,
    /// Items completed successfully
    pub completed_count: i64,
    /// Items that failed
    pub failed_count: i64,
    /// Share of items in a finished state (0.0 to 100.0)
    pub progress_percentage: f64,
    /// Whether the batch reached a terminal status (last event of the stream)
    pub is_complete: bool,
    /// Item being generated right now, if the worker is on this batch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_item: Option<CurrentItem>,
}

/// Processing log entry as returned by the API
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct LogEntry {
    /// When the entry was written
    pub timestamp: DateTime<Utc>,
    /// Severity
    pub level: String,
    /// Item the entry refers to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<i64>,
    /// Human-readable message
    pub message: String,
    /// Structured details
    #[schema(value_type = Object)]
    pub details: serde_json::Value,
}

/// Event emitted during batch processing
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Batch persisted and queued
    BatchCreated {
        /// Batch identifier
        batch_id: BatchId,
        /// Number of items
        total_items: i64,
    },

    /// Worker claimed the batch
    BatchStarted {
        /// Batch identifier
        batch_id: BatchId,
    },

    /// Worker claimed an item
    ItemStarted {
        /// Batch identifier
        batch_id: BatchId,
        /// Item id
        item_id: i64,
        /// Position within the batch
        order_index: i64,
    },

    /// Item generated successfully
    ItemCompleted {
        /// Batch identifier
        batch_id: BatchId,
        /// Item id
        item_id: i64,
        /// Words in the generated article
        word_count: i64,
    },

    /// Item generation failed
    ItemFailed {
        /// Batch identifier
        batch_id: BatchId,
        /// Item id
        item_id: i64,
        /// Failure reason
        error: String,
    },

    /// Every item reached a terminal state
    BatchCompleted {
        /// Batch identifier
        batch_id: BatchId,
        /// Items completed successfully
        completed_count: i64,
        /// Items that failed
        failed_count: i64,
    },

    /// Worker failed while orchestrating the batch
    BatchFailed {
        /// Batch identifier
        batch_id: BatchId,
        /// Failure reason
        error: String,
    },

    /// Owner cancelled the batch
    BatchCancelled {
        /// Batch identifier
        batch_id: BatchId,
        /// Number of queued items moved to skipped
        skipped_items: u64,
    },

    /// Processor is shutting down
    Shutdown,
}

impl Event {
    /// Event name used on the SSE wire
    pub fn name(&self) -> &'static str {
        match self {
            Event::BatchCreated { .. } => "batch_created",
            Event::BatchStarted { .. } => "batch_started",
            Event::ItemStarted { .. } => "item_started",
            Event::ItemCompleted { .. } => "item_completed",
            Event::ItemFailed { .. } => "item_failed",
            Event::BatchCompleted { .. } => "batch_completed",
            Event::BatchFailed { .. } => "batch_failed",
            Event::BatchCancelled { .. } => "batch_cancelled",
            Event::Shutdown => "shutdown",
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_status_codes_round_trip() {
        for status in [
            BatchStatus::Pending,
            BatchStatus::Processing,
            BatchStatus::Completed,
            BatchStatus::Failed,
            BatchStatus::Cancelled,
        ] {
            assert_eq!(BatchStatus::from_i32(status.to_i32()), status);
        }
        assert_eq!(BatchStatus::from_i32(99), BatchStatus::Failed);
    }

    #[test]
    fn terminal_states() {
        assert!(!BatchStatus::Pending.is_terminal());
        assert!(!BatchStatus::Processing.is_terminal());
        assert!(BatchStatus::Completed.is_terminal());
        assert!(BatchStatus::Failed.is_terminal());
        assert!(BatchStatus::Cancelled.is_terminal());

        assert!(!ItemStatus::Queued.is_terminal());
        assert!(!ItemStatus::Processing.is_terminal());
        assert!(ItemStatus::Skipped.is_terminal());
    }

    #[test]
    fn batch_id_format() {
        let id = BatchId::generate();
        let parts: Vec<&str> = id.as_str().split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "batch");
        assert_eq!(parts[1].len(), 8);
        assert_eq!(parts[2].len(), 8);
        assert_ne!(BatchId::generate(), BatchId::generate());
    }

    #[test]
    fn tone_parsing_is_lenient() {
        assert_eq!(Tone::from_str_lossy("Casual"), Tone::Casual);
        assert_eq!(Tone::from_str_lossy(" expert "), Tone::Expert);
        assert_eq!(Tone::from_str_lossy("nonsense"), Tone::Professional);
    }

    #[test]
    fn item_spec_accepts_minimal_json() {
        let spec: ItemSpec = serde_json::from_str(r#"{"topic":"Rust"}"#).unwrap();
        assert_eq!(spec.topic, "Rust");
        assert!(spec.tone.is_none());

        let spec: ItemSpec =
            serde_json::from_str(r#"{"topic":"Rust","tone":"academic","word_count":800}"#)
                .unwrap();
        assert_eq!(spec.tone, Some(Tone::Academic));
        assert_eq!(spec.word_count, Some(800));
    }

    #[test]
    fn event_serializes_with_type_tag() {
        let event = Event::BatchCancelled {
            batch_id: BatchId::from("batch_x"),
            skipped_items: 3,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "batch_cancelled");
        assert_eq!(json["skipped_items"], 3);
        assert_eq!(event.name(), "batch_cancelled");
    }
}
