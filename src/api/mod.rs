//! REST API server module
//!
//! Provides an OpenAPI 3.1 compliant REST API for submitting article
//! batches, following their progress and cancelling them.

use crate::{BatchProcessor, Config, Result};
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// Every batch route takes an `owner` query parameter (default: `default_user`).
///
/// # Routes
///
/// ## Batches
/// - `POST /batches` - Create a batch
/// - `GET /batches` - List batches (`status`, `offset`, `limit`)
/// - `GET /batches/:batch_id` - Batch status with items
/// - `GET /batches/:batch_id/stream` - Server-sent status updates
/// - `POST /batches/:batch_id/cancel` - Cancel a batch
/// - `GET /batches/:batch_id/logs` - Processing log (`offset`, `limit`)
///
/// ## System
/// - `GET /health` - Health check
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
/// - `GET /events` - Server-sent processing events
/// - `POST /shutdown` - Graceful shutdown
pub fn create_router(processor: Arc<BatchProcessor>, config: Arc<Config>) -> Router {
    let state = AppState::new(processor, config.clone());

    let router = Router::new()
        // Batches
        .route(
            "/batches",
            get(routes::list_batches).post(routes::create_batch),
        )
        .route("/batches/:batch_id", get(routes::get_batch))
        .route("/batches/:batch_id/stream", get(routes::stream_batch))
        .route("/batches/:batch_id/cancel", post(routes::cancel_batch))
        .route("/batches/:batch_id/logs", get(routes::batch_logs))
        // System
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec))
        .route("/events", get(routes::event_stream))
        .route("/shutdown", post(routes::shutdown));

    // SwaggerUi serves its own copy of the document; it cannot share /openapi.json
    let router = if config.server.api.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    router.with_state(state).layer(TraceLayer::new_for_http())
}

/// Start the API server on the configured bind address.
///
/// Runs until the processor begins shutting down. Open event streams are not
/// waited for.
///
/// # Example
///
/// ```no_run
/// use article_batch::{BatchProcessor, Config};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Config::default();
/// let processor = Arc::new(BatchProcessor::new(config.clone()).await?);
///
/// // Start API server (blocks until shutdown)
/// article_batch::api::start_api_server(processor, Arc::new(config)).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(processor: Arc<BatchProcessor>, config: Arc<Config>) -> Result<()> {
    let bind_address = config.server.api.bind_address;

    tracing::info!(
        address = %bind_address,
        "Starting API server"
    );

    let app = create_router(processor.clone(), config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(
        address = %listener.local_addr().map_err(crate::error::Error::Io)?,
        "API server listening"
    );

    tokio::select! {
        served = axum::serve(listener, app) => {
            served.map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;
        }
        _ = processor.shutdown_requested() => {}
    }

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
