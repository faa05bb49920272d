//! Bulk operation handlers.

use super::{OwnerQuery, QueueActionResponse};
use crate::api::AppState;
use axum::{
    Json,
    extract::{Query, State},
};

/// POST /queue/pause - Pause every running task (optionally one owner's)
#[utoipa::path(
    post,
    path = "/api/v1/queue/pause",
    tag = "queue",
    params(OwnerQuery),
    responses(
        (status = 200, description = "Number of tasks paused", body = QueueActionResponse)
    )
)]
pub async fn pause_queue(
    State(state): State<AppState>,
    Query(query): Query<OwnerQuery>,
) -> Json<QueueActionResponse> {
    let affected = match query.owner {
        Some(owner) => state.manager.pause_owner(owner).await,
        None => state.manager.pause_all().await,
    };
    Json(QueueActionResponse { affected })
}

/// POST /queue/resume - Resume every paused task (optionally one owner's)
#[utoipa::path(
    post,
    path = "/api/v1/queue/resume",
    tag = "queue",
    params(OwnerQuery),
    responses(
        (status = 200, description = "Number of tasks resumed", body = QueueActionResponse)
    )
)]
pub async fn resume_queue(
    State(state): State<AppState>,
    Query(query): Query<OwnerQuery>,
) -> Json<QueueActionResponse> {
    let affected = match query.owner {
        Some(owner) => state.manager.resume_owner(owner).await,
        None => state.manager.resume_all().await,
    };
    Json(QueueActionResponse { affected })
}

/// POST /queue/cancel - Cancel every running or paused task (optionally one owner's)
#[utoipa::path(
    post,
    path = "/api/v1/queue/cancel",
    tag = "queue",
    params(OwnerQuery),
    responses(
        (status = 200, description = "Number of tasks cancelled", body = QueueActionResponse)
    )
)]
pub async fn cancel_queue(
    State(state): State<AppState>,
    Query(query): Query<OwnerQuery>,
) -> Json<QueueActionResponse> {
    let affected = match query.owner {
        Some(owner) => state.manager.cancel_owner(owner).await,
        None => state.manager.cancel_all().await,
    };
    Json(QueueActionResponse { affected })
}
