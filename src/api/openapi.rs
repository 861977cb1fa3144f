//! OpenAPI documentation and schema generation
//!
//! The document is generated at compile time by utoipa from the route
//! annotations in [`crate::api::routes`].

use utoipa::OpenApi;

/// OpenAPI documentation for the article-batch REST API
///
/// The spec can be accessed via:
/// - `/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation (when enabled)
#[derive(OpenApi)]
#[openapi(
    info(
        title = "article-batch REST API",
        version = "0.1.0",
        description = "Queue batches of article generation requests, follow their progress and cancel them",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    paths(
        // Batches
        crate::api::routes::create_batch,
        crate::api::routes::list_batches,
        crate::api::routes::get_batch,
        crate::api::routes::stream_batch,
        crate::api::routes::cancel_batch,
        crate::api::routes::batch_logs,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
        crate::api::routes::shutdown,
    ),
    components(schemas(
        crate::types::BatchId,
        crate::types::BatchStatus,
        crate::types::ItemStatus,
        crate::types::Tone,
        crate::types::LogLevel,
        crate::types::ItemSpec,
        crate::types::NewBatchRequest,
        crate::types::BatchCreated,
        crate::types::CancelResult,
        crate::types::ItemInfo,
        crate::types::BatchInfo,
        crate::types::BatchSummary,
        crate::types::CurrentItem,
        crate::types::BatchStatusUpdate,
        crate::types::LogEntry,
        crate::types::Event,

        crate::config::Config,
        crate::config::PersistenceConfig,
        crate::config::WorkerConfig,
        crate::config::StreamConfig,
        crate::config::GenerationConfig,
        crate::config::ServerIntegrationConfig,
        crate::config::ApiConfig,

        crate::api::routes::OwnerQuery,
        crate::api::routes::ListBatchesQuery,
        crate::api::routes::LogsQuery,

        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "batches", description = "Batch management - Create batches, follow their progress, cancel them and read their logs"),
        (name = "system", description = "System endpoints - Health checks, OpenAPI spec, events, shutdown"),
    )
)]
pub struct ApiDoc;
