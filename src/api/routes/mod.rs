//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`batches`] - Batch creation, status, streaming, cancellation and logs
//! - [`system`] - Health, events, OpenAPI, shutdown

use serde::{Deserialize, Serialize};

mod batches;
mod system;

// Re-export all handlers so `routes::function_name` continues to work
pub use batches::*;
pub use system::*;

// ============================================================================
// Query/Request Types (shared across handlers)
// ============================================================================

/// Default page size for GET /batches
pub const DEFAULT_LIST_LIMIT: i64 = 20;
/// Default page size for GET /batches/:batch_id/logs
pub const DEFAULT_LOG_LIMIT: i64 = 100;

/// Query parameters identifying the caller
#[derive(Debug, Deserialize, Serialize, utoipa::IntoParams, utoipa::ToSchema)]
#[into_params(parameter_in = Query)]
pub struct OwnerQuery {
    /// Owner of the batch (default: "default_user")
    #[serde(default = "crate::types::default_owner")]
    pub owner: String,
}

/// Query parameters for GET /batches
#[derive(Debug, Deserialize, Serialize, utoipa::IntoParams, utoipa::ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ListBatchesQuery {
    /// Owner whose batches to list (default: "default_user")
    #[serde(default = "crate::types::default_owner")]
    pub owner: String,
    /// Filter by status: pending, processing, completed, failed or cancelled
    pub status: Option<String>,
    /// Number of batches to skip (default: 0)
    pub offset: Option<i64>,
    /// Maximum number of batches to return, 1 to 100 (default: 20)
    pub limit: Option<i64>,
}

/// Query parameters for GET /batches/:batch_id/logs
#[derive(Debug, Deserialize, Serialize, utoipa::IntoParams, utoipa::ToSchema)]
#[into_params(parameter_in = Query)]
pub struct LogsQuery {
    /// Owner of the batch (default: "default_user")
    #[serde(default = "crate::types::default_owner")]
    pub owner: String,
    /// Number of entries to skip (default: 0)
    pub offset: Option<i64>,
    /// Maximum number of entries to return, 1 to 1000 (default: 100)
    pub limit: Option<i64>,
}
