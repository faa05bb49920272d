//! Task manager split into focused submodules.
//!
//! The `TaskManager` struct and its methods are organized by domain:
//! - [`submit`] - Admission of single objects
//! - [`batch`] - Album fan-out and the top-level `download` entry
//! - [`control`] - Task lifecycle control (pause/resume/cancel, bulk variants, retire)
//! - [`config_ops`] - Runtime configuration updates
//! - [`status`] - Completeness reports against local storage
//! - [`lifecycle`] - Startup restore and shutdown coordination
//! - [`services`] - Background service starters
//! - [`download_task`] - Core task execution
//! - [`handle`] - Live per-task state
//! - [`admission`] - Runtime-adjustable concurrency gate

mod admission;
mod batch;
mod config_ops;
mod control;
mod download_task;
mod handle;
mod lifecycle;
mod services;
mod status;
mod submit;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use submit::TaskTicket;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64};

use tokio::sync::{Mutex, broadcast};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::media_source::MediaSource;
use crate::notifier::{NotificationSink, Notifier};
use crate::paths::PathResolver;
use crate::reporter::ProgressReporter;
use crate::types::{Event, TaskId};

use admission::AdmissionControl;
use handle::TaskHandle;

/// Live tasks and admission state
#[derive(Clone)]
pub(crate) struct RegistryState {
    /// Live tasks by id; terminal tasks are retired from here
    pub(crate) tasks: Arc<Mutex<HashMap<TaskId, Arc<TaskHandle>>>>,
    /// Concurrency gate (limit adjustable at runtime)
    pub(crate) admission: Arc<AdmissionControl>,
    /// Admission counter used to build task ids
    pub(crate) next_id: Arc<AtomicU64>,
    /// Flag to indicate whether new tasks are accepted (set to false during shutdown)
    pub(crate) accepting_new: Arc<AtomicBool>,
    /// Cancelled once shutdown starts; stops background services
    pub(crate) shutdown: CancellationToken,
}

/// Runtime-mutable configuration (separate from static config)
#[derive(Clone)]
pub(crate) struct RuntimeConfig {
    /// Progress refresh interval in milliseconds
    pub(crate) refresh_interval_ms: Arc<AtomicU64>,
}

/// Main task manager instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct TaskManager {
    /// Database instance for persistence (wrapped in Arc for sharing across tasks)
    /// Public for integration tests to query task records
    pub db: Arc<Database>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Where object bytes come from
    pub(crate) source: Arc<dyn MediaSource>,
    /// Rate-limited chat notifications
    pub(crate) notifier: Notifier,
    /// Per-owner aggregate progress messages
    pub(crate) reporter: Arc<ProgressReporter>,
    /// Destination path derivation
    pub(crate) paths: PathResolver,
    /// Live tasks and admission state
    pub(crate) registry: RegistryState,
    /// Runtime-mutable configuration
    pub(crate) runtime_config: RuntimeConfig,
}

impl TaskManager {
    /// Create a new TaskManager instance
    ///
    /// This initializes all core components:
    /// - Validates the configuration
    /// - Opens/creates the SQLite database and runs migrations
    /// - Sets up the event broadcast channel and the rate-limited notifier
    /// - Re-registers every task a previous process left unfinished
    pub async fn new(
        config: Config,
        source: Arc<dyn MediaSource>,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<Self> {
        config.validate()?;

        tokio::fs::create_dir_all(&config.download.download_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create download directory '{}': {}",
                        config.download.download_dir.display(),
                        e
                    ),
                ))
            })?;

        let db = Database::new(&config.persistence.database_path).await?;

        // Buffer of 1000 events; slow subscribers see RecvError::Lagged
        let (event_tx, _rx) = broadcast::channel(1000);

        let notifier = Notifier::new(
            sink,
            config.notifications.max_per_second,
            config.notifications.max_per_minute,
        );
        let reporter = Arc::new(ProgressReporter::new(notifier.clone()));

        let paths = PathResolver::new(
            config.download.download_dir.clone(),
            config.download.fallback_dir.clone(),
            config.download.classify_by_type,
        );

        let registry = RegistryState {
            tasks: Arc::new(Mutex::new(HashMap::new())),
            admission: Arc::new(AdmissionControl::new(
                config.download.max_concurrent_downloads,
            )),
            next_id: Arc::new(AtomicU64::new(0)),
            accepting_new: Arc::new(AtomicBool::new(true)),
            shutdown: CancellationToken::new(),
        };

        let runtime_config = RuntimeConfig {
            refresh_interval_ms: Arc::new(AtomicU64::new(
                config.download.refresh_interval.as_millis() as u64,
            )),
        };

        let manager = Self {
            db: Arc::new(db),
            event_tx,
            config: Arc::new(config),
            source,
            notifier,
            reporter,
            paths,
            registry,
            runtime_config,
        };

        let restored = manager.restore_tasks().await?;
        if restored > 0 {
            tracing::info!(restored, "Restored unfinished tasks from database");
        }

        Ok(manager)
    }

    /// Subscribe to task events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events independently.
    /// Events are buffered, but if a subscriber falls behind by more than 1000 events,
    /// it will receive a `RecvError::Lagged` error.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::sync::Arc;
    /// use tgmedia_dl::{Config, TaskManager};
    /// use tgmedia_dl::notifier::NoOpNotificationSink;
    /// # use tgmedia_dl::media_source::MediaSource;
    ///
    /// # async fn example(source: Arc<dyn MediaSource>) -> Result<(), Box<dyn std::error::Error>> {
    /// let manager = TaskManager::new(Config::default(), source, Arc::new(NoOpNotificationSink)).await?;
    ///
    /// let mut events = manager.subscribe();
    /// tokio::spawn(async move {
    ///     while let Ok(event) = events.recv().await {
    ///         tracing::info!(?event, "task event");
    ///     }
    /// });
    /// # Ok(())
    /// # }
    /// ```
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    ///
    /// Runtime overrides (concurrency limit, refresh interval) are not reflected
    /// here; query them through [`concurrency_limit`](Self::concurrency_limit) and
    /// [`refresh_interval`](Self::refresh_interval).
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Emit an event to all subscribers
    ///
    /// If there are no active subscribers, the event is silently dropped.
    pub(crate) fn emit_event(&self, event: Event) {
        // send() returns Err if there are no receivers, which is fine - we just drop the event
        self.event_tx.send(event).ok();
    }

    /// Spawn the REST API server in a background task
    ///
    /// Listens on the configured bind address (default: 127.0.0.1:6790).
    pub fn spawn_api_server(&self) -> tokio::task::JoinHandle<Result<()>> {
        let manager = Arc::new(self.clone());
        let config = self.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(manager, config).await })
    }
}
