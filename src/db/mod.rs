//! Database layer for article-batch
//!
//! Handles SQLite persistence for batches, their items, the processing log and
//! runtime state.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] - Database lifecycle, schema migrations
//! - [`batches`] - Batch creation, claiming, completion and cancellation
//! - [`items`] - Item claiming and outcome recording
//! - [`logs`] - Processing log reads and writes
//! - [`state`] - Runtime state (shutdown tracking)
//!
//! Every state transition writes its log row and counter updates in the same
//! transaction as the status change.

use crate::Error;
use crate::error::DatabaseError;
use crate::types::BatchId;
use sqlx::{FromRow, sqlite::SqlitePool};

mod batches;
mod items;
mod logs;
mod migrations;
mod state;

pub use batches::CancelledBatch;
pub use items::ItemRecorded;

/// Stored batch status codes
pub mod batch_status {
    /// Waiting for the worker
    pub const PENDING: i32 = 0;
    /// Worker has claimed the batch
    pub const PROCESSING: i32 = 1;
    /// Every item reached a terminal state
    pub const COMPLETED: i32 = 2;
    /// Worker-level failure
    pub const FAILED: i32 = 3;
    /// Cancelled by its owner
    pub const CANCELLED: i32 = 4;
}

/// Stored item status codes
pub mod item_status {
    /// Waiting to be claimed
    pub const QUEUED: i32 = 0;
    /// Claimed, generation in flight
    pub const PROCESSING: i32 = 1;
    /// Generated successfully
    pub const COMPLETED: i32 = 2;
    /// Generation failed
    pub const FAILED: i32 = 3;
    /// Never started (batch cancelled)
    pub const SKIPPED: i32 = 4;
}

/// New batch to be inserted into the database
#[derive(Debug, Clone)]
pub struct NewBatch {
    /// Public identifier
    pub batch_id: BatchId,
    /// Owner of the batch
    pub owner: String,
    /// Display name
    pub name: String,
    /// Optional description
    pub description: Option<String>,
    /// File the items were uploaded from
    pub source_filename: Option<String>,
    /// Opaque default settings (JSON text)
    pub default_config: Option<String>,
}

/// New item to be inserted with its batch, all defaults already applied
#[derive(Debug, Clone, PartialEq)]
pub struct NewItem {
    /// Article topic
    pub topic: String,
    /// Comma-separated keywords
    pub keywords: String,
    /// Writing tone
    pub tone: String,
    /// Target length in words
    pub word_count: i64,
    /// Persona override (empty = none)
    pub custom_persona: String,
    /// Number of reference links
    pub link_count: i64,
    /// Place links inline
    pub use_inline_links: bool,
    /// APA citation style
    pub use_apa_style: bool,
    /// Additional fields (JSON text)
    pub extra_fields: Option<String>,
}

/// Batch record from database
#[derive(Debug, Clone, FromRow)]
pub struct BatchRow {
    /// Internal row id
    pub id: i64,
    /// Public identifier
    pub batch_id: BatchId,
    /// Owner of the batch
    pub owner: String,
    /// Display name
    pub name: String,
    /// Optional description
    pub description: Option<String>,
    /// File the items were uploaded from
    pub source_filename: Option<String>,
    /// Current status (see [`batch_status`])
    pub status: i32,
    /// Number of items, fixed at creation
    pub total_items: i64,
    /// Items completed successfully
    pub completed_count: i64,
    /// Items that failed
    pub failed_count: i64,
    /// Opaque default settings (JSON text)
    pub default_config: Option<String>,
    /// Worker-level failure reason
    pub error_message: Option<String>,
    /// Unix timestamp when the batch was created
    pub created_at: i64,
    /// Unix timestamp when the worker claimed the batch
    pub started_at: Option<i64>,
    /// Unix timestamp when the batch reached a terminal status
    pub completed_at: Option<i64>,
}

/// Item record from database
#[derive(Debug, Clone, FromRow)]
pub struct ItemRow {
    /// Unique database ID
    pub id: i64,
    /// Row id of the owning batch
    pub batch_id: i64,
    /// Position within the batch (0-based)
    pub order_index: i64,
    /// Article topic
    pub topic: String,
    /// Comma-separated keywords
    pub keywords: String,
    /// Writing tone
    pub tone: String,
    /// Target length in words
    pub word_count: i64,
    /// Persona override (empty = none)
    pub custom_persona: String,
    /// Number of reference links
    pub link_count: i64,
    /// Place links inline
    pub use_inline_links: bool,
    /// APA citation style
    pub use_apa_style: bool,
    /// Additional fields (JSON text)
    pub extra_fields: Option<String>,
    /// Current status (see [`item_status`])
    pub status: i32,
    /// Number of times the item was claimed
    pub attempt_count: i64,
    /// Failure reason
    pub error_message: Option<String>,
    /// Generated title
    pub generated_title: Option<String>,
    /// Generated body (markdown)
    pub generated_content: Option<String>,
    /// Generated meta description
    pub meta_description: Option<String>,
    /// Words in the generated article
    pub actual_word_count: Option<i64>,
    /// Unix timestamp when the item was queued
    pub queued_at: i64,
    /// Unix timestamp when the item was claimed
    pub started_at: Option<i64>,
    /// Unix timestamp when the item reached a terminal status
    pub completed_at: Option<i64>,
    /// Wall-clock time spent generating
    pub processing_duration_seconds: Option<f64>,
}

/// Processing log record from database
#[derive(Debug, Clone, FromRow)]
pub struct LogRow {
    /// Unique database ID
    pub id: i64,
    /// Row id of the batch
    pub batch_id: i64,
    /// Item the entry refers to
    pub item_id: Option<i64>,
    /// `INFO`, `WARNING` or `ERROR`
    pub level: String,
    /// Human-readable message
    pub message: String,
    /// Structured details (JSON text)
    pub details: String,
    /// Unix timestamp when the entry was written
    pub created_at: i64,
}

/// Database handle for article-batch
pub struct Database {
    pool: SqlitePool,
}

/// Map a sqlx error into a query failure with context ("Failed to <context>: ...")
fn query_failed(context: &'static str) -> impl FnOnce(sqlx::Error) -> Error {
    move |e| Error::Database(DatabaseError::QueryFailed(format!("Failed to {}: {}", context, e)))
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
