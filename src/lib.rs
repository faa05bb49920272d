//! # tgmedia-dl
//!
//! Download task orchestration for media held in a messaging service.
//!
//! A [`TaskManager`] admits download requests for media objects (a file in a
//! chat message, or every file of an album), runs them under a runtime
//! adjustable concurrency limit, and lets their owners pause, resume and
//! cancel them. Progress is pushed to owners through a rate-limited
//! [`NotificationSink`](notifier::NotificationSink) and to programmatic
//! consumers through an event channel and an optional REST API.
//!
//! The messaging service itself stays behind the
//! [`MediaSource`](media_source::MediaSource) trait, so the library owns
//! scheduling, persistence and local storage layout but no protocol client.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use tgmedia_dl::{Config, SourceRef, TaskManager};
//! use tgmedia_dl::notifier::NoOpNotificationSink;
//! # use tgmedia_dl::media_source::MediaSource;
//!
//! # async fn example(source: Arc<dyn MediaSource>) -> tgmedia_dl::Result<()> {
//! let manager = TaskManager::new(Config::default(), source, Arc::new(NoOpNotificationSink)).await?;
//!
//! // Subscribe to events
//! let mut events = manager.subscribe();
//! tokio::spawn(async move {
//!     while let Ok(event) = events.recv().await {
//!         println!("Event: {:?}", event);
//!     }
//! });
//!
//! let report = manager.download(SourceRef::new("somechannel", 42), 1001).await?;
//! println!("{} new, {} skipped", report.summary.new, report.summary.skipped);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Database persistence layer
pub mod db;
/// Error types
pub mod error;
/// Detection of artifacts already on disk
pub mod existence;
/// Message link parsing
pub mod link;
/// Task manager (decomposed into focused submodules)
pub mod manager;
/// Media source abstraction
pub mod media_source;
/// Rate-limited chat notifications
pub mod notifier;
/// Destination path derivation
pub mod paths;
/// Progress math and message rendering
pub mod progress;
/// Sliding-window rate limiting
pub mod rate_limiter;
/// Per-owner progress messages
pub mod reporter;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use db::Database;
pub use error::{
    ApiError, DatabaseError, Error, ErrorDetail, NotifyError, Result, TaskError, ToHttpStatus,
    TransferError,
};
pub use link::parse_message_link;
pub use manager::{TaskManager, TaskTicket};
pub use media_source::{MediaSource, ProgressObserver};
pub use notifier::{NoOpNotificationSink, NotificationSink};
pub use types::{
    BatchSummary, CompletenessReport, DownloadReport, Event, MissingFile, ObjectMetadata, OwnerId,
    SourceRef, TaskId, TaskInfo, TaskOutcome, TaskState,
};

/// Helper function to run the manager with graceful signal handling.
///
/// Waits for a termination signal and then calls the manager's `shutdown()` method.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use tgmedia_dl::{Config, NoOpNotificationSink, TaskManager, run_with_shutdown};
/// # use tgmedia_dl::MediaSource;
///
/// # async fn example(source: Arc<dyn MediaSource>) -> Result<(), Box<dyn std::error::Error>> {
/// let manager = TaskManager::new(Config::default(), source, Arc::new(NoOpNotificationSink)).await?;
/// let _reporter = manager.start_progress_reporter();
/// let _api = manager.spawn_api_server();
///
/// // Run with automatic signal handling
/// run_with_shutdown(manager).await?;
/// # Ok(())
/// # }
/// ```
pub async fn run_with_shutdown(manager: TaskManager) -> Result<()> {
    wait_for_signal().await;
    manager.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), Ok(mut sigint)) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            sigint.recv().await;
            tracing::info!("Received SIGINT signal (Ctrl+C)");
        }
        (Ok(mut sigterm), Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            sigterm.recv().await;
            tracing::info!("Received SIGTERM signal");
        }
        (Err(e), Err(_)) => {
            tracing::error!(error = %e, "Could not register any signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C signal"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C signal"),
    }
}
