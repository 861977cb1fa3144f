//! Read-side views of batches: progress math and row-to-API conversions.

use crate::db::{BatchRow, ItemRow, LogRow};
use crate::types::{
    BatchInfo, BatchStatus, BatchStatusUpdate, BatchSummary, CurrentItem, ItemInfo, ItemStatus,
    LogEntry,
};
use chrono::{DateTime, TimeZone, Utc};

/// Share of items in a finished state, 0.0 to 100.0
///
/// An empty batch reports 0.
pub fn progress_percentage(total: i64, completed: i64, failed: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    (completed + failed) as f64 / total as f64 * 100.0
}

/// Whether a batch in this status will never change again
pub fn is_complete(status: BatchStatus) -> bool {
    status.is_terminal()
}

fn to_datetime(timestamp: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(timestamp, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

impl From<ItemRow> for ItemInfo {
    fn from(row: ItemRow) -> Self {
        let status = ItemStatus::from_i32(row.status);
        ItemInfo {
            id: row.id,
            order_index: row.order_index,
            topic: row.topic,
            status,
            error_message: row.error_message,
            word_count: row.actual_word_count,
            processing_minutes: row
                .processing_duration_seconds
                .filter(|_| status.is_terminal())
                .map(|secs| secs / 60.0),
        }
    }
}

impl From<LogRow> for LogEntry {
    fn from(row: LogRow) -> Self {
        LogEntry {
            timestamp: to_datetime(row.created_at),
            level: row.level,
            item_id: row.item_id,
            message: row.message,
            details: serde_json::from_str(&row.details)
                .unwrap_or_else(|_| serde_json::Value::Object(Default::default())),
        }
    }
}

impl From<BatchRow> for BatchSummary {
    fn from(row: BatchRow) -> Self {
        BatchSummary {
            progress_percentage: progress_percentage(
                row.total_items,
                row.completed_count,
                row.failed_count,
            ),
            batch_id: row.batch_id,
            name: row.name,
            status: BatchStatus::from_i32(row.status),
            total_items: row.total_items,
            completed_count: row.completed_count,
            failed_count: row.failed_count,
            created_at: to_datetime(row.created_at),
            completed_at: row.completed_at.map(to_datetime),
        }
    }
}

/// Full status view of a batch and its items
pub fn batch_info(row: BatchRow, items: Vec<ItemRow>) -> BatchInfo {
    let status = BatchStatus::from_i32(row.status);
    BatchInfo {
        progress_percentage: progress_percentage(
            row.total_items,
            row.completed_count,
            row.failed_count,
        ),
        is_complete: is_complete(status),
        batch_id: row.batch_id,
        name: row.name,
        description: row.description,
        status,
        total_items: row.total_items,
        completed_count: row.completed_count,
        failed_count: row.failed_count,
        created_at: to_datetime(row.created_at),
        started_at: row.started_at.map(to_datetime),
        completed_at: row.completed_at.map(to_datetime),
        error_message: row.error_message,
        items: items.into_iter().map(ItemInfo::from).collect(),
    }
}

/// Trimmed status view used on the status stream
pub fn status_update(row: &BatchRow, current_item: Option<CurrentItem>) -> BatchStatusUpdate {
    let status = BatchStatus::from_i32(row.status);
    BatchStatusUpdate {
        batch_id: row.batch_id.clone(),
        status,
        total_items: row.total_items,
        completed_count: row.completed_count,
        failed_count: row.failed_count,
        progress_percentage: progress_percentage(
            row.total_items,
            row.completed_count,
            row.failed_count,
        ),
        is_complete: is_complete(status),
        current_item,
    }
}
