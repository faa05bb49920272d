//! Startup restore and shutdown coordination.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::db::TaskUpdate;
use crate::error::Result;
use crate::types::{Event, TaskState};

use super::TaskManager;
use super::download_task::NoticePolicy;
use super::handle::{NewTask, TaskHandle};

/// How long shutdown waits for cancelled tasks to leave the registry
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Poll interval while draining the registry
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Counter part of a `task_{counter}_{unix}` id
fn id_counter(id: &str) -> Option<u64> {
    id.strip_prefix("task_")?.split('_').next()?.parse().ok()
}

impl TaskManager {
    /// Re-register and re-schedule every task a previous process left unfinished
    ///
    /// Running and paused records restart from `pending`; the existence check
    /// decides whether their partial artifact is reused. Each owner is told
    /// the task is resuming.
    pub(crate) async fn restore_tasks(&self) -> Result<usize> {
        let records = self.db.list_unfinished_tasks().await?;

        // Keep new ids ahead of the restored ones
        let highest = records
            .iter()
            .filter_map(|record| id_counter(record.task_id.as_str()))
            .max()
            .unwrap_or(0);
        self.registry.next_id.fetch_max(highest, Ordering::SeqCst);

        let count = records.len();
        for record in records {
            let seq = id_counter(record.task_id.as_str()).unwrap_or_else(|| {
                self.registry.next_id.fetch_add(1, Ordering::SeqCst) + 1
            });
            let handle = Arc::new(TaskHandle::new(NewTask::from_record(&record, seq)));

            let reset = TaskUpdate {
                status: Some(TaskState::Pending),
                progress: Some(0.0),
                bytes_transferred: Some(0),
                ..Default::default()
            };
            if let Err(e) = self.db.update_task(&handle.id, &reset).await {
                tracing::warn!(task_id = %handle.id, error = %e, "Failed to reset restored task");
            }

            tracing::info!(
                task_id = %handle.id,
                previous_state = %record.status,
                source = %handle.source,
                "Restoring unfinished task"
            );
            self.register(handle.clone()).await;
            self.emit_event(Event::TaskRestored {
                id: handle.id.clone(),
            });
            // Ticket dropped: restored tasks run detached
            drop(self.spawn_task(handle, NoticePolicy::Restored));
        }

        Ok(count)
    }

    /// Gracefully shut down the manager
    ///
    /// This method performs a graceful shutdown sequence:
    /// 1. Stops accepting new submissions
    /// 2. Stops background services (progress reporter)
    /// 3. Cancels every live task, pending ones included
    /// 4. Waits for the registry to drain with a timeout (30 seconds)
    /// 5. Emits [`Event::Shutdown`]
    ///
    /// Cancelled tasks keep their durable record with state `cancelled`.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        self.registry.accepting_new.store(false, Ordering::SeqCst);
        self.registry.shutdown.cancel();
        tracing::info!("Stopped accepting new tasks");

        let mut cancelled = 0;
        for handle in self.live_handles(None).await {
            if self.force_cancel(&handle).await {
                cancelled += 1;
            }
        }
        tracing::info!(cancelled, "Signaled cancellation to all live tasks");

        match tokio::time::timeout(SHUTDOWN_TIMEOUT, self.wait_for_drain()).await {
            Ok(()) => tracing::info!("All tasks finished"),
            Err(_) => {
                tracing::warn!("Timeout waiting for tasks to finish, proceeding with shutdown")
            }
        }

        self.emit_event(Event::Shutdown);
        tracing::info!("Graceful shutdown complete");
        Ok(())
    }

    /// Whether [`shutdown`](Self::shutdown) has started
    pub fn is_shutting_down(&self) -> bool {
        !self.registry.accepting_new.load(Ordering::SeqCst)
    }

    /// Token cancelled once shutdown starts
    pub(crate) fn shutdown_token(&self) -> CancellationToken {
        self.registry.shutdown.clone()
    }

    async fn wait_for_drain(&self) {
        loop {
            let live = self.registry.tasks.lock().await.len();
            if live == 0 {
                return;
            }
            tracing::debug!(live, "Waiting for tasks to finish");
            tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
        }
    }
}
