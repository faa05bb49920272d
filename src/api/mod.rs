//! REST API server module
//!
//! Provides an OpenAPI 3.1 compliant REST API for submitting and controlling
//! download tasks, adjusting runtime configuration, and following events.

use crate::{Config, Result, TaskManager};
use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Tasks
/// - `GET /tasks?owner=` - List live tasks
/// - `POST /tasks` - Submit a download for one object
/// - `POST /links` - Submit a download from a message link
/// - `GET /tasks/:id` - Get single task (live or recorded)
/// - `DELETE /tasks/:id` - Remove a finished task's record
/// - `POST /tasks/:id/pause` - Pause task
/// - `POST /tasks/:id/resume` - Resume task
/// - `POST /tasks/:id/cancel` - Cancel task
///
/// ## Bulk Operations
/// - `POST /queue/pause?owner=` - Pause all running tasks
/// - `POST /queue/resume?owner=` - Resume all paused tasks
/// - `POST /queue/cancel?owner=` - Cancel all running and paused tasks
///
/// ## History
/// - `GET /history?owner=&status=` - Durable task records
///
/// ## Configuration
/// - `GET /config` - Startup configuration
/// - `GET|PUT /config/concurrency` - Concurrency limit
/// - `GET|PUT /config/refresh-interval` - Progress refresh interval
///
/// ## Status
/// - `GET /status/:container/:object_id` - Completeness on local storage
///
/// ## System
/// - `GET /health` - Health check
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
/// - `GET /events` - Server-sent events stream
pub fn create_router(manager: Arc<TaskManager>, config: Arc<Config>) -> Router {
    let state = AppState::new(manager, config.clone());

    let router = Router::new()
        // Tasks
        .route("/tasks", get(routes::list_tasks).post(routes::submit_task))
        .route("/links", post(routes::submit_link))
        .route(
            "/tasks/:id",
            get(routes::get_task).delete(routes::purge_task),
        )
        .route("/tasks/:id/pause", post(routes::pause_task))
        .route("/tasks/:id/resume", post(routes::resume_task))
        .route("/tasks/:id/cancel", post(routes::cancel_task))
        // Bulk operations
        .route("/queue/pause", post(routes::pause_queue))
        .route("/queue/resume", post(routes::resume_queue))
        .route("/queue/cancel", post(routes::cancel_queue))
        // History
        .route("/history", get(routes::get_history))
        // Configuration
        .route("/config", get(routes::get_config))
        .route(
            "/config/concurrency",
            get(routes::get_concurrency).put(routes::set_concurrency),
        )
        .route(
            "/config/refresh-interval",
            get(routes::get_refresh_interval).put(routes::set_refresh_interval),
        )
        // Status
        .route("/status/:container/:object_id", get(routes::check_status))
        // System
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec))
        .route("/events", get(routes::event_stream));

    // Merge Swagger UI routes before applying state
    let router = if config.server.api.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/api/v1/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    let router = router.with_state(state).layer(TraceLayer::new_for_http());

    if config.server.api.cors_enabled {
        let cors = build_cors_layer(&config.server.api.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// `"*"` (or an empty list) allows any origin.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// Runs until the manager starts shutting down or the listener fails.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use tgmedia_dl::{Config, TaskManager, media_source::MediaSource, notifier::NotificationSink};
///
/// # async fn example(
/// #     source: Arc<dyn MediaSource>,
/// #     sink: Arc<dyn NotificationSink>,
/// # ) -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let manager = Arc::new(TaskManager::new((*config).clone(), source, sink).await?);
///
/// tgmedia_dl::api::start_api_server(manager, config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(manager: Arc<TaskManager>, config: Arc<Config>) -> Result<()> {
    let bind_address = config.server.api.bind_address;

    tracing::info!(address = %bind_address, "Starting API server");

    let shutdown = manager.shutdown_token();
    let app = create_router(manager, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(address = %bind_address, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
