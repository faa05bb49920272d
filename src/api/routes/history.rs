//! Task history handlers.

use super::HistoryQuery;
use crate::api::AppState;
use crate::error::Error;
use crate::types::{TaskInfo, TaskState};
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// GET /history - Durable task records, oldest first
#[utoipa::path(
    get,
    path = "/api/v1/history",
    tag = "history",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Recorded tasks", body = Vec<TaskInfo>),
        (status = 400, description = "Unknown status filter", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError)
    )
)]
pub async fn get_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Response {
    let status = match query.status.as_deref().map(parse_state).transpose() {
        Ok(status) => status,
        Err(e) => return e.into_response(),
    };

    match state.manager.db.list_tasks(status, query.owner).await {
        Ok(records) => {
            let tasks: Vec<TaskInfo> = records.into_iter().map(TaskInfo::from).collect();
            (StatusCode::OK, Json(tasks)).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to query task history");
            e.into_response()
        }
    }
}

/// Strict state parsing; `TaskState::from_name` maps unknown names to `failed`
fn parse_state(name: &str) -> crate::Result<TaskState> {
    let state = TaskState::from_name(name);
    if state.as_str() == name {
        Ok(state)
    } else {
        Err(Error::Config {
            message: format!("unknown status filter '{}'", name),
            key: Some("status".to_string()),
        })
    }
}
