//! Batch handlers.

use super::{DEFAULT_LIST_LIMIT, DEFAULT_LOG_LIMIT, ListBatchesQuery, LogsQuery, OwnerQuery};
use crate::api::AppState;
use crate::error::{Error, ToHttpStatus};
use crate::processor::StatusStreamEvent;
use crate::types::{BatchId, BatchStatus, NewBatchRequest};
use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event as SseEvent, KeepAlive, Sse},
    },
};
use std::convert::Infallible;
use tokio_stream::StreamExt;

/// Turn a processor error into a response, logging server-side failures
fn error_response(error: Error, context: &str) -> Response {
    if error.status_code() >= 500 {
        tracing::error!(error = %error, "{}", context);
    } else {
        tracing::debug!(error = %error, "{}", context);
    }
    error.into_response()
}

/// POST /batches - Create a batch of articles
#[utoipa::path(
    post,
    path = "/batches",
    tag = "batches",
    request_body = crate::types::NewBatchRequest,
    responses(
        (status = 201, description = "Batch created and queued", body = crate::types::BatchCreated),
        (status = 422, description = "Invalid batch or item", body = crate::error::ApiError),
        (status = 503, description = "Shutting down", body = crate::error::ApiError)
    )
)]
pub async fn create_batch(
    State(state): State<AppState>,
    payload: Result<Json<NewBatchRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return Error::Validation(rejection.body_text()).into_response(),
    };

    match state.processor.create_batch(request).await {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(e) => error_response(e, "Failed to create batch"),
    }
}

/// GET /batches - List an owner's batches
#[utoipa::path(
    get,
    path = "/batches",
    tag = "batches",
    params(ListBatchesQuery),
    responses(
        (status = 200, description = "Batches, newest first", body = Vec<crate::types::BatchSummary>),
        (status = 422, description = "Invalid paging or status filter", body = crate::error::ApiError)
    )
)]
pub async fn list_batches(
    State(state): State<AppState>,
    Query(query): Query<ListBatchesQuery>,
) -> Response {
    let status = match query.status.as_deref().map(str::parse::<BatchStatus>) {
        None => None,
        Some(Ok(status)) => Some(status),
        Some(Err(message)) => return Error::Validation(message).into_response(),
    };

    match state
        .processor
        .list_batches(
            &query.owner,
            status,
            query.offset.unwrap_or(0),
            query.limit.unwrap_or(DEFAULT_LIST_LIMIT),
        )
        .await
    {
        Ok(batches) => (StatusCode::OK, Json(batches)).into_response(),
        Err(e) => error_response(e, "Failed to list batches"),
    }
}

/// GET /batches/:batch_id - Batch status with items
#[utoipa::path(
    get,
    path = "/batches/{batch_id}",
    tag = "batches",
    params(
        ("batch_id" = String, Path, description = "Batch identifier"),
        OwnerQuery
    ),
    responses(
        (status = 200, description = "Batch status", body = crate::types::BatchInfo),
        (status = 403, description = "Batch belongs to another owner", body = crate::error::ApiError),
        (status = 404, description = "Batch not found", body = crate::error::ApiError)
    )
)]
pub async fn get_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
    Query(query): Query<OwnerQuery>,
) -> Response {
    let batch_id = BatchId::from(batch_id);
    match state
        .processor
        .get_batch_status(&batch_id, &query.owner)
        .await
    {
        Ok(info) => (StatusCode::OK, Json(info)).into_response(),
        Err(e) => error_response(e, "Failed to get batch status"),
    }
}

/// GET /batches/:batch_id/stream - Status updates until the batch finishes
///
/// Emits `status` events whenever the status or a counter changes; the event
/// with `is_complete: true` is the last one. A missing or foreign batch yields
/// a single `error` event.
#[utoipa::path(
    get,
    path = "/batches/{batch_id}/stream",
    tag = "batches",
    params(
        ("batch_id" = String, Path, description = "Batch identifier"),
        OwnerQuery
    ),
    responses(
        (status = 200, description = "Server-sent events stream (text/event-stream)", content_type = "text/event-stream")
    )
)]
pub async fn stream_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
    Query(query): Query<OwnerQuery>,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let updates = state
        .processor
        .status_stream(BatchId::from(batch_id), query.owner);

    let sse_stream = updates.filter_map(|event| {
        let data = match &event {
            StatusStreamEvent::Status(update) => serde_json::to_string(update),
            StatusStreamEvent::Error(detail) => serde_json::to_string(detail),
        };
        match data {
            Ok(json_data) => Some(Ok(SseEvent::default().event(event.name()).data(json_data))),
            Err(e) => {
                tracing::warn!("Failed to serialize status update to JSON: {}", e);
                None
            }
        }
    });

    Sse::new(sse_stream).keep_alive(KeepAlive::default())
}

/// POST /batches/:batch_id/cancel - Cancel a pending or processing batch
#[utoipa::path(
    post,
    path = "/batches/{batch_id}/cancel",
    tag = "batches",
    params(
        ("batch_id" = String, Path, description = "Batch identifier"),
        OwnerQuery
    ),
    responses(
        (status = 200, description = "Batch cancelled", body = crate::types::CancelResult),
        (status = 403, description = "Batch belongs to another owner", body = crate::error::ApiError),
        (status = 404, description = "Batch not found", body = crate::error::ApiError),
        (status = 409, description = "Batch already finished", body = crate::error::ApiError)
    )
)]
pub async fn cancel_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
    Query(query): Query<OwnerQuery>,
) -> Response {
    let batch_id = BatchId::from(batch_id);
    match state.processor.cancel_batch(&batch_id, &query.owner).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => error_response(e, "Failed to cancel batch"),
    }
}

/// GET /batches/:batch_id/logs - Processing log, newest first
#[utoipa::path(
    get,
    path = "/batches/{batch_id}/logs",
    tag = "batches",
    params(
        ("batch_id" = String, Path, description = "Batch identifier"),
        LogsQuery
    ),
    responses(
        (status = 200, description = "Log entries", body = Vec<crate::types::LogEntry>),
        (status = 403, description = "Batch belongs to another owner", body = crate::error::ApiError),
        (status = 404, description = "Batch not found", body = crate::error::ApiError),
        (status = 422, description = "Invalid paging", body = crate::error::ApiError)
    )
)]
pub async fn batch_logs(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
    Query(query): Query<LogsQuery>,
) -> Response {
    let batch_id = BatchId::from(batch_id);
    match state
        .processor
        .batch_logs(
            &batch_id,
            &query.owner,
            query.offset.unwrap_or(0),
            query.limit.unwrap_or(DEFAULT_LOG_LIMIT),
        )
        .await
    {
        Ok(logs) => (StatusCode::OK, Json(logs)).into_response(),
        Err(e) => error_response(e, "Failed to read batch logs"),
    }
}
