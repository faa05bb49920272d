//! Task management handlers.

use super::{OwnerQuery, SubmitLinkRequest, SubmitTaskRequest, SubmitTaskResponse};
use crate::api::AppState;
use crate::error::{Error, TaskError};
use crate::link::parse_message_link;
use crate::types::{SourceRef, TaskId, TaskInfo};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// GET /tasks - List live tasks
#[utoipa::path(
    get,
    path = "/api/v1/tasks",
    tag = "tasks",
    params(OwnerQuery),
    responses(
        (status = 200, description = "Live tasks in admission order", body = Vec<TaskInfo>)
    )
)]
pub async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<OwnerQuery>,
) -> Json<Vec<TaskInfo>> {
    Json(state.manager.list_tasks(query.owner).await)
}

/// GET /tasks/:id - Get single task
#[utoipa::path(
    get,
    path = "/api/v1/tasks/{id}",
    tag = "tasks",
    params(
        ("id" = String, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Task information", body = TaskInfo),
        (status = 404, description = "Task not found", body = crate::error::ApiError)
    )
)]
pub async fn get_task(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = TaskId::from(id);
    match state.manager.get_task(&id).await {
        Some(info) => (StatusCode::OK, Json(info)).into_response(),
        None => Error::Task(TaskError::NotFound { id }).into_response(),
    }
}

/// POST /tasks - Submit a download for one object
#[utoipa::path(
    post,
    path = "/api/v1/tasks",
    tag = "tasks",
    request_body = SubmitTaskRequest,
    responses(
        (status = 201, description = "Task admitted", body = SubmitTaskResponse),
        (status = 404, description = "Object not found at the source", body = crate::error::ApiError),
        (status = 502, description = "Media source failed", body = crate::error::ApiError),
        (status = 503, description = "Shutting down", body = crate::error::ApiError)
    )
)]
pub async fn submit_task(
    State(state): State<AppState>,
    Json(request): Json<SubmitTaskRequest>,
) -> Response {
    let source = SourceRef::new(request.container, request.object_id);
    submit(&state, source, request.owner).await
}

/// POST /links - Submit a download from a message link
#[utoipa::path(
    post,
    path = "/api/v1/links",
    tag = "tasks",
    request_body = SubmitLinkRequest,
    responses(
        (status = 201, description = "Task admitted", body = SubmitTaskResponse),
        (status = 400, description = "Link could not be parsed", body = crate::error::ApiError),
        (status = 404, description = "Object not found at the source", body = crate::error::ApiError),
        (status = 503, description = "Shutting down", body = crate::error::ApiError)
    )
)]
pub async fn submit_link(
    State(state): State<AppState>,
    Json(request): Json<SubmitLinkRequest>,
) -> Response {
    match parse_message_link(&request.link) {
        Ok(source) => submit(&state, source, request.owner).await,
        Err(e) => {
            tracing::debug!(link = %request.link, error = %e, "Rejected message link");
            e.into_response()
        }
    }
}

async fn submit(state: &AppState, source: SourceRef, owner: crate::types::OwnerId) -> Response {
    match state.manager.submit(source, owner).await {
        Ok(id) => (StatusCode::CREATED, Json(SubmitTaskResponse { id })).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /tasks/:id/pause - Pause a running task
#[utoipa::path(
    post,
    path = "/api/v1/tasks/{id}/pause",
    tag = "tasks",
    params(
        ("id" = String, Path, description = "Task ID")
    ),
    responses(
        (status = 204, description = "Task paused"),
        (status = 404, description = "Task not found", body = crate::error::ApiError),
        (status = 409, description = "Task is not running", body = crate::error::ApiError)
    )
)]
pub async fn pause_task(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = TaskId::from(id);
    let applied = state.manager.pause(&id).await;
    control_response(&state, id, "pause", applied).await
}

/// POST /tasks/:id/resume - Resume a paused task
#[utoipa::path(
    post,
    path = "/api/v1/tasks/{id}/resume",
    tag = "tasks",
    params(
        ("id" = String, Path, description = "Task ID")
    ),
    responses(
        (status = 204, description = "Task resumed"),
        (status = 404, description = "Task not found", body = crate::error::ApiError),
        (status = 409, description = "Task is not paused", body = crate::error::ApiError)
    )
)]
pub async fn resume_task(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = TaskId::from(id);
    let applied = state.manager.resume(&id).await;
    control_response(&state, id, "resume", applied).await
}

/// POST /tasks/:id/cancel - Cancel a running or paused task
#[utoipa::path(
    post,
    path = "/api/v1/tasks/{id}/cancel",
    tag = "tasks",
    params(
        ("id" = String, Path, description = "Task ID")
    ),
    responses(
        (status = 204, description = "Task cancelled"),
        (status = 404, description = "Task not found", body = crate::error::ApiError),
        (status = 409, description = "Task cannot be cancelled in its current state", body = crate::error::ApiError)
    )
)]
pub async fn cancel_task(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = TaskId::from(id);
    let applied = state.manager.cancel(&id).await;
    control_response(&state, id, "cancel", applied).await
}

/// DELETE /tasks/:id - Remove a finished task's record
#[utoipa::path(
    delete,
    path = "/api/v1/tasks/{id}",
    tag = "tasks",
    params(
        ("id" = String, Path, description = "Task ID")
    ),
    responses(
        (status = 204, description = "Record removed"),
        (status = 404, description = "Task not found", body = crate::error::ApiError),
        (status = 409, description = "Task is still live", body = crate::error::ApiError)
    )
)]
pub async fn purge_task(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = TaskId::from(id);
    match state.manager.purge(&id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => Error::Task(TaskError::NotFound { id }).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Turn a control operation's boolean into 204, 404 or 409
async fn control_response(
    state: &AppState,
    id: TaskId,
    operation: &str,
    applied: bool,
) -> Response {
    if applied {
        return StatusCode::NO_CONTENT.into_response();
    }

    match state.manager.get_task(&id).await {
        Some(info) => Error::Task(TaskError::InvalidState {
            id,
            operation: operation.to_string(),
            current_state: info.state.to_string(),
        })
        .into_response(),
        None => Error::Task(TaskError::NotFound { id }).into_response(),
    }
}
