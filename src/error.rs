//! Error types for article-batch
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error types (batch lifecycle, database, generation)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for article-batch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for article-batch
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "generation.endpoint")
        key: Option<String>,
    },

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// Batch lifecycle error (not found, wrong owner, invalid transition)
    #[error("batch error: {0}")]
    Batch(#[from] BatchError),

    /// Invalid batch or item specification
    #[error("validation error: {0}")]
    Validation(String),

    /// The content generation service failed or returned unusable output
    #[error("generation error: {0}")]
    Generation(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Shutdown in progress
    #[error("shutdown in progress")]
    ShuttingDown,

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),
}

/// Batch lifecycle errors
#[derive(Debug, Error)]
pub enum BatchError {
    /// No batch with this identifier
    #[error("batch {batch_id} not found")]
    NotFound {
        /// The batch identifier that was not found
        batch_id: String,
    },

    /// The caller does not own the batch
    #[error("not authorized to access batch {batch_id}")]
    Unauthorized {
        /// The batch identifier
        batch_id: String,
    },

    /// Operation not allowed in the batch's current status
    #[error("cannot {operation} batch {batch_id} in state {current_state}")]
    InvalidState {
        /// The batch identifier
        batch_id: String,
        /// The operation that was attempted (e.g., "cancel")
        operation: String,
        /// The status that prevents the operation (e.g., "completed")
        current_state: String,
    },
}

/// API error response format
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "batch_not_found",
///     "message": "batch error: batch batch_1a2b3c4d_20260301 not found",
///     "details": {
///       "batch_id": "batch_1a2b3c4d_20260301"
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "validation_error")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create a "not found" error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new("not_found", format!("{} not found", resource.into()))
    }

    /// Create a "validation error" error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request
            Error::Config { .. } => 400,

            // 422 Unprocessable Entity
            Error::Validation(_) => 422,

            // 403 / 404 / 409 for batch lifecycle errors
            Error::Batch(BatchError::NotFound { .. }) => 404,
            Error::Batch(BatchError::Unauthorized { .. }) => 403,
            Error::Batch(BatchError::InvalidState { .. }) => 409,

            // 500 Internal Server Error
            Error::Database(_) => 500,
            Error::Io(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Serialization(_) => 500,
            Error::Other(_) => 500,

            // 502 Bad Gateway - generation service errors
            Error::Generation(_) => 502,

            // 503 Service Unavailable
            Error::ShuttingDown => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Database(_) => "database_error",
            Error::Batch(e) => match e {
                BatchError::NotFound { .. } => "batch_not_found",
                BatchError::Unauthorized { .. } => "unauthorized",
                BatchError::InvalidState { .. } => "invalid_state",
            },
            Error::Validation(_) => "validation_error",
            Error::Generation(_) => "generation_error",
            Error::Io(_) => "io_error",
            Error::ShuttingDown => "shutting_down",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Batch(BatchError::NotFound { batch_id })
            | Error::Batch(BatchError::Unauthorized { batch_id }) => Some(serde_json::json!({
                "batch_id": batch_id,
            })),
            Error::Batch(BatchError::InvalidState {
                batch_id,
                operation,
                current_state,
            }) => Some(serde_json::json!({
                "batch_id": batch_id,
                "operation": operation,
                "current_state": current_state,
            })),
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
