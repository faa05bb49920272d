//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`tasks`] — Individual task management
//! - [`queue`] — Bulk operations across tasks
//! - [`history`] — Durable task records
//! - [`config`] — Runtime configuration
//! - [`status`] — Completeness checks against local storage
//! - [`system`] — Health, events, OpenAPI

use serde::{Deserialize, Serialize};

use crate::types::OwnerId;

mod config;
mod history;
mod queue;
mod status;
mod system;
mod tasks;

// Re-export all handlers so `routes::function_name` works
pub use config::*;
pub use history::*;
pub use queue::*;
pub use status::*;
pub use system::*;
pub use tasks::*;

// ============================================================================
// Query/Request Types (shared across handlers)
// ============================================================================

/// Query parameter narrowing a listing or bulk operation to one owner
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OwnerQuery {
    /// Only tasks requested by this principal
    pub owner: Option<OwnerId>,
}

/// Query parameters for GET /history
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    /// Only tasks requested by this principal
    pub owner: Option<OwnerId>,
    /// Filter by state name: "pending", "running", "paused", "cancelled", "completed" or "failed"
    pub status: Option<String>,
}

/// Request body for POST /tasks
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SubmitTaskRequest {
    /// Chat id or public username
    pub container: String,
    /// Message id within the container
    pub object_id: i64,
    /// Requesting principal
    pub owner: OwnerId,
}

/// Request body for POST /links
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SubmitLinkRequest {
    /// Message link, e.g. `https://t.me/somechannel/42`
    pub link: String,
    /// Requesting principal
    pub owner: OwnerId,
}

/// Response for task submission
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SubmitTaskResponse {
    /// Identifier of the admitted task
    pub id: crate::types::TaskId,
}

/// Response for bulk queue operations
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct QueueActionResponse {
    /// Number of tasks the operation applied to
    pub affected: usize,
}

/// Request/response body for /config/concurrency
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ConcurrencyLimit {
    /// Maximum number of simultaneously running tasks (1 to 20)
    pub limit: usize,
}

/// Request/response body for /config/refresh-interval
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct RefreshInterval {
    /// Seconds between progress updates (0.1 to 60)
    pub interval_secs: f64,
}
