//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the tgmedia-dl REST API
//! using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the tgmedia-dl REST API
///
/// The spec can be accessed via:
/// - `/api/v1/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "tgmedia-dl REST API",
        version = "0.1.0",
        description = "REST API for submitting, controlling and monitoring media download tasks",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:6790/api/v1", description = "Local development server")
    ),
    paths(
        // Tasks
        crate::api::routes::list_tasks,
        crate::api::routes::get_task,
        crate::api::routes::submit_task,
        crate::api::routes::submit_link,
        crate::api::routes::pause_task,
        crate::api::routes::resume_task,
        crate::api::routes::cancel_task,
        crate::api::routes::purge_task,

        // Bulk operations
        crate::api::routes::pause_queue,
        crate::api::routes::resume_queue,
        crate::api::routes::cancel_queue,

        // History
        crate::api::routes::get_history,

        // Configuration
        crate::api::routes::get_config,
        crate::api::routes::get_concurrency,
        crate::api::routes::set_concurrency,
        crate::api::routes::get_refresh_interval,
        crate::api::routes::set_refresh_interval,

        // Status
        crate::api::routes::check_status,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::TaskId,
        crate::types::TaskState,
        crate::types::TaskInfo,
        crate::types::TaskOutcome,
        crate::types::SourceRef,
        crate::types::ObjectMetadata,
        crate::types::BatchSummary,
        crate::types::DownloadReport,
        crate::types::MissingFile,
        crate::types::CompletenessReport,
        crate::types::Event,

        // Config types from config.rs
        crate::config::Config,
        crate::config::DownloadConfig,
        crate::config::NotificationConfig,
        crate::config::PersistenceConfig,
        crate::config::ServerIntegrationConfig,
        crate::config::ApiConfig,

        // API request/response types
        crate::api::routes::OwnerQuery,
        crate::api::routes::HistoryQuery,
        crate::api::routes::SubmitTaskRequest,
        crate::api::routes::SubmitLinkRequest,
        crate::api::routes::SubmitTaskResponse,
        crate::api::routes::QueueActionResponse,
        crate::api::routes::ConcurrencyLimit,
        crate::api::routes::RefreshInterval,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "tasks", description = "Task management - Submit, pause, resume, cancel and inspect tasks"),
        (name = "queue", description = "Bulk operations - Pause, resume or cancel all tasks, optionally per owner"),
        (name = "history", description = "History - Durable task records"),
        (name = "config", description = "Configuration - Concurrency limit and refresh interval"),
        (name = "status", description = "Status - Completeness of objects and albums on local storage"),
        (name = "system", description = "System endpoints - Health checks, OpenAPI spec, events"),
    )
)]
pub struct ApiDoc;
