//! Background service starters.

use crate::types::TaskInfo;

use super::TaskManager;

impl TaskManager {
    /// Start the per-owner progress reporter
    ///
    /// Every refresh interval the reporter receives a snapshot of all
    /// non-terminal tasks and updates each owner's progress message. The
    /// interval is re-read on every tick, so
    /// [`set_refresh_interval`](Self::set_refresh_interval) applies without a
    /// restart. The loop ends when shutdown starts. Does nothing when
    /// `progress_messages` is disabled in the configuration.
    pub fn start_progress_reporter(&self) -> tokio::task::JoinHandle<()> {
        let manager = self.clone();
        let enabled = self.config.notifications.progress_messages;

        tokio::spawn(async move {
            if !enabled {
                tracing::debug!("Progress messages disabled, reporter not started");
                return;
            }

            loop {
                tokio::select! {
                    _ = manager.registry.shutdown.cancelled() => break,
                    _ = tokio::time::sleep(manager.refresh_interval()) => {}
                }

                let active: Vec<TaskInfo> = manager
                    .list_tasks(None)
                    .await
                    .into_iter()
                    .filter(|task| !task.state.is_terminal())
                    .collect();
                manager.reporter.refresh(&active).await;
            }

            tracing::debug!("Progress reporter stopped");
        })
    }
}
