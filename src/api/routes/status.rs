//! Completeness check handler.

use crate::api::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// GET /status/:container/:object_id - Check what is on disk for an object or its album
#[utoipa::path(
    get,
    path = "/api/v1/status/{container}/{object_id}",
    tag = "status",
    params(
        ("container" = String, Path, description = "Chat id or public username"),
        ("object_id" = i64, Path, description = "Message id")
    ),
    responses(
        (status = 200, description = "Completeness report", body = crate::types::CompletenessReport),
        (status = 404, description = "Object not found at the source", body = crate::error::ApiError),
        (status = 502, description = "Media source failed", body = crate::error::ApiError)
    )
)]
pub async fn check_status(
    State(state): State<AppState>,
    Path((container, object_id)): Path<(String, i64)>,
) -> Response {
    match state.manager.check_status(&container, object_id).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => e.into_response(),
    }
}
