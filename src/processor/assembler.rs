//! Batch assembly: validation, defaults and atomic creation.

use crate::db::{NewBatch, NewItem};
use crate::error::{Error, Result};
use crate::types::{BatchCreated, BatchId, BatchStatus, Event, ItemSpec, NewBatchRequest};
use std::sync::atomic::Ordering;

use super::BatchProcessor;

/// Target length used when an item does not name one
pub(crate) const DEFAULT_WORD_COUNT: i64 = 1000;
/// Reference link count used when an item does not name one
pub(crate) const DEFAULT_LINK_COUNT: i64 = 5;

impl BatchProcessor {
    /// Create a batch and queue all of its items
    ///
    /// Every item is validated before anything is written; a single bad item
    /// rejects the whole request. On success the batch is `pending`, each item
    /// is `queued` with `order_index` equal to its position in the request, and
    /// a creation log entry exists, all committed together.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] for an empty name, no items, too many items or
    ///   an invalid item
    /// - [`Error::ShuttingDown`] once shutdown has started
    pub async fn create_batch(&self, request: NewBatchRequest) -> Result<BatchCreated> {
        if !self.worker.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        let (batch, items) = assemble(request, self.config.worker.max_items_per_batch)?;

        let row = self.db.create_batch_with_items(&batch, &items).await?;

        tracing::info!(
            batch_id = %row.batch_id,
            owner = %row.owner,
            total_items = row.total_items,
            "Batch created"
        );

        self.emit_event(Event::BatchCreated {
            batch_id: row.batch_id.clone(),
            total_items: row.total_items,
        });

        Ok(BatchCreated {
            batch_id: row.batch_id,
            status: BatchStatus::Pending,
            total_items: row.total_items,
        })
    }
}

/// Validate a request and turn it into store records with defaults applied
pub(crate) fn assemble(
    request: NewBatchRequest,
    max_items: usize,
) -> Result<(NewBatch, Vec<NewItem>)> {
    let owner = request.owner.trim().to_string();
    if owner.is_empty() {
        return Err(Error::Validation("owner must not be empty".to_string()));
    }

    let name = request.name.trim().to_string();
    if name.is_empty() {
        return Err(Error::Validation("batch name must not be empty".to_string()));
    }

    if request.items.is_empty() {
        return Err(Error::Validation(
            "a batch needs at least one item".to_string(),
        ));
    }
    if request.items.len() > max_items {
        return Err(Error::Validation(format!(
            "a batch holds at most {} items, got {}",
            max_items,
            request.items.len()
        )));
    }

    let items = request
        .items
        .iter()
        .enumerate()
        .map(|(position, spec)| normalize_item(position, spec))
        .collect::<Result<Vec<_>>>()?;

    let default_config = request
        .default_config
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    let batch = NewBatch {
        batch_id: BatchId::generate(),
        owner,
        name,
        description: request
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
        source_filename: request.source_filename,
        default_config,
    };

    Ok((batch, items))
}

fn normalize_item(position: usize, spec: &ItemSpec) -> Result<NewItem> {
    let topic = spec.topic.trim();
    if topic.is_empty() {
        return Err(Error::Validation(format!(
            "item {}: topic must not be empty",
            position
        )));
    }

    let word_count = spec.word_count.unwrap_or(DEFAULT_WORD_COUNT);
    if word_count <= 0 {
        return Err(Error::Validation(format!(
            "item {}: word_count must be positive, got {}",
            position, word_count
        )));
    }

    let link_count = spec.link_count.unwrap_or(DEFAULT_LINK_COUNT);
    if link_count < 0 {
        return Err(Error::Validation(format!(
            "item {}: link_count must not be negative, got {}",
            position, link_count
        )));
    }

    let extra_fields = match &spec.extra_fields {
        Some(fields) if !fields.is_empty() => Some(serde_json::to_string(fields)?),
        _ => None,
    };

    Ok(NewItem {
        topic: topic.to_string(),
        keywords: spec.keywords.as_deref().unwrap_or("").trim().to_string(),
        tone: spec.tone.unwrap_or_default().as_str().to_string(),
        word_count,
        custom_persona: spec
            .custom_persona
            .as_deref()
            .unwrap_or("")
            .trim()
            .to_string(),
        link_count,
        use_inline_links: spec.use_inline_links.unwrap_or(true),
        use_apa_style: spec.use_apa_style.unwrap_or(false),
        extra_fields,
    })
}
