//! Configuration handlers.

use super::{ConcurrencyLimit, RefreshInterval};
use crate::api::AppState;
use crate::error::Error;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::time::Duration;

/// GET /config - Get the configuration the manager was started with
#[utoipa::path(
    get,
    path = "/api/v1/config",
    tag = "config",
    responses(
        (status = 200, description = "Startup configuration", body = crate::config::Config)
    )
)]
pub async fn get_config(State(state): State<AppState>) -> impl IntoResponse {
    let config = state.manager.get_config();
    (StatusCode::OK, Json((*config).clone()))
}

/// GET /config/concurrency - Get the concurrency limit
#[utoipa::path(
    get,
    path = "/api/v1/config/concurrency",
    tag = "config",
    responses(
        (status = 200, description = "Current concurrency limit", body = ConcurrencyLimit)
    )
)]
pub async fn get_concurrency(State(state): State<AppState>) -> Json<ConcurrencyLimit> {
    Json(ConcurrencyLimit {
        limit: state.manager.concurrency_limit(),
    })
}

/// PUT /config/concurrency - Change the concurrency limit
#[utoipa::path(
    put,
    path = "/api/v1/config/concurrency",
    tag = "config",
    request_body = ConcurrencyLimit,
    responses(
        (status = 204, description = "Limit updated"),
        (status = 400, description = "Limit out of range", body = crate::error::ApiError)
    )
)]
pub async fn set_concurrency(
    State(state): State<AppState>,
    Json(request): Json<ConcurrencyLimit>,
) -> Response {
    match state.manager.set_concurrency_limit(request.limit) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /config/refresh-interval - Get the progress refresh interval
#[utoipa::path(
    get,
    path = "/api/v1/config/refresh-interval",
    tag = "config",
    responses(
        (status = 200, description = "Current refresh interval", body = RefreshInterval)
    )
)]
pub async fn get_refresh_interval(State(state): State<AppState>) -> Json<RefreshInterval> {
    Json(RefreshInterval {
        interval_secs: state.manager.refresh_interval().as_secs_f64(),
    })
}

/// PUT /config/refresh-interval - Change the progress refresh interval
#[utoipa::path(
    put,
    path = "/api/v1/config/refresh-interval",
    tag = "config",
    request_body = RefreshInterval,
    responses(
        (status = 204, description = "Interval updated"),
        (status = 400, description = "Interval out of range", body = crate::error::ApiError)
    )
)]
pub async fn set_refresh_interval(
    State(state): State<AppState>,
    Json(request): Json<RefreshInterval>,
) -> Response {
    let interval = match Duration::try_from_secs_f64(request.interval_secs) {
        Ok(interval) => interval,
        Err(_) => {
            return Error::Config {
                message: format!("{} is not a valid interval", request.interval_secs),
                key: Some("refresh_interval".to_string()),
            }
            .into_response();
        }
    };

    match state.manager.set_refresh_interval(interval) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}
