//! Error types for tgmedia-dl
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error types (task control, media transfer, persistence)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::types::TaskId;

/// Result type alias for tgmedia-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for tgmedia-dl
///
/// Only admission-time failures surface through this type. Failures inside a
/// running task are captured on the task itself and never propagate.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "max_concurrent_downloads")
        key: Option<String>,
    },

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// Task control error
    #[error("task error: {0}")]
    Task(#[from] TaskError),

    /// Media source failed while answering a metadata query
    #[error("media source error: {0}")]
    Source(#[from] TransferError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested object or task not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Message link could not be turned into a source reference
    #[error("invalid message link: {0}")]
    InvalidLink(String),

    /// Shutdown in progress - not accepting new tasks
    #[error("shutdown in progress: not accepting new tasks")]
    ShuttingDown,

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),
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

/// Task control errors
#[derive(Debug, Error)]
pub enum TaskError {
    /// Task not known to the registry or the database
    #[error("task {id} not found")]
    NotFound {
        /// The task ID that was not found
        id: TaskId,
    },

    /// Cannot perform operation in current state
    #[error("cannot {operation} task {id} in state {current_state}")]
    InvalidState {
        /// The task that is in an invalid state for the operation
        id: TaskId,
        /// The operation that was attempted (e.g., "purge")
        operation: String,
        /// The current state that prevents the operation
        current_state: String,
    },
}

/// Failure reported by a [`MediaSource`](crate::media_source::MediaSource)
#[derive(Debug, Error)]
pub enum TransferError {
    /// The progress observer asked the transfer to stop
    #[error("transfer aborted")]
    Aborted,

    /// The object does not exist at the source
    #[error("object not found: {0}")]
    NotFound(String),

    /// Local write failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other source-side failure (network, protocol, flood wait)
    #[error("{0}")]
    Source(String),
}

/// Failure reported by a [`NotificationSink`](crate::notifier::NotificationSink)
///
/// Never propagated past the notifier; logged and dropped.
#[derive(Debug, Error)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);

/// API error response format
///
/// This structure is returned by API endpoints when an error occurs.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "task_not_found",
///     "message": "task task_3_1718000000 not found"
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
    /// Machine-readable error code (e.g., "not_found", "config_error")
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

    /// Create an API error with additional details
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    /// Create a "not found" error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new("not_found", format!("{} not found", resource.into()))
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
            // 400 Bad Request - Client error (invalid input)
            Error::Config { .. } => 400,
            Error::InvalidLink(_) => 400,

            // 404 Not Found
            Error::NotFound(_) => 404,
            Error::Task(TaskError::NotFound { .. }) => 404,
            Error::Source(TransferError::NotFound(_)) => 404,

            // 409 Conflict
            Error::Task(TaskError::InvalidState { .. }) => 409,

            // 502 Bad Gateway - the messaging service failed us
            Error::Source(_) => 502,

            // 503 Service Unavailable
            Error::ShuttingDown => 503,

            // 500 Internal Server Error
            Error::Database(_)
            | Error::Io(_)
            | Error::Serialization(_)
            | Error::ApiServerError(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Database(_) => "database_error",
            Error::Task(e) => match e {
                TaskError::NotFound { .. } => "task_not_found",
                TaskError::InvalidState { .. } => "invalid_state",
            },
            Error::Source(TransferError::NotFound(_)) => "object_not_found",
            Error::Source(_) => "source_error",
            Error::Io(_) => "io_error",
            Error::NotFound(_) => "not_found",
            Error::InvalidLink(_) => "invalid_link",
            Error::ShuttingDown => "shutting_down",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({ "key": key })),
            Error::Task(TaskError::NotFound { id }) => {
                Some(serde_json::json!({ "task_id": id.as_str() }))
            }
            Error::Task(TaskError::InvalidState {
                id,
                operation,
                current_state,
            }) => Some(serde_json::json!({
                "task_id": id.as_str(),
                "operation": operation,
                "current_state": current_state,
            })),
            _ => None,
        };

        match details {
            Some(details) => ApiError::with_details(code, message, details),
            None => ApiError::new(code, message),
        }
    }
}
