//! Terminal state, slot release and retirement.

use crate::db::TaskUpdate;
use crate::types::{Event, TaskOutcome, TaskState};

use super::super::admission::AdmissionPermit;
use super::context::DownloadTaskContext;

impl DownloadTaskContext {
    /// Move the task to its terminal state and clean up after it
    ///
    /// A set cancel token wins over whatever the transfer produced. The slot is
    /// released right after the state change, before persistence and notices.
    pub(super) async fn finalize(
        &self,
        outcome: TaskOutcome,
        permit: Option<AdmissionPermit>,
    ) -> TaskOutcome {
        let handle = &self.handle;

        let (outcome, update) = {
            let mut status = handle.status.lock().await;
            let outcome = if handle.is_cancelled() {
                TaskOutcome::Cancelled
            } else {
                outcome
            };

            match &outcome {
                TaskOutcome::Completed { path } => {
                    status.state = TaskState::Completed;
                    status.progress = 1.0;
                    status.file_paths = vec![path.clone()];
                }
                TaskOutcome::Skipped { path } => {
                    status.state = TaskState::Completed;
                    status.progress = 1.0;
                    status.skipped = true;
                    status.file_paths = vec![path.clone()];
                }
                TaskOutcome::Cancelled => {
                    status.state = TaskState::Cancelled;
                }
                TaskOutcome::Failed { error } => {
                    status.state = TaskState::Failed;
                    status.error = Some(error.clone());
                }
            }
            status.speed_bps = 0.0;

            let update = TaskUpdate {
                status: Some(status.state),
                progress: Some(status.progress),
                bytes_transferred: Some(status.bytes_transferred),
                bytes_total: Some(status.bytes_total),
                error_message: status.error.clone(),
                file_paths: Some(status.file_paths.clone()),
                skipped: Some(status.skipped),
            };
            (outcome, update)
        };

        drop(permit);
        // Wake anything still parked on the gate
        handle.open_gate();

        if let Err(e) = self.manager.db.update_task(&handle.id, &update).await {
            tracing::warn!(task_id = %handle.id, error = %e, "Failed to persist final task state");
        }

        match &outcome {
            TaskOutcome::Completed { path } => {
                tracing::info!(task_id = %handle.id, path = %path.display(), "Task completed");
                self.manager.emit_event(Event::TaskCompleted {
                    id: handle.id.clone(),
                    path: path.clone(),
                });
            }
            TaskOutcome::Skipped { path } => {
                tracing::info!(task_id = %handle.id, path = %path.display(), "Task skipped");
                self.manager.emit_event(Event::TaskSkipped {
                    id: handle.id.clone(),
                    path: path.clone(),
                });
            }
            TaskOutcome::Cancelled => {
                tracing::info!(task_id = %handle.id, "Task cancelled");
                self.manager.emit_event(Event::TaskCancelled {
                    id: handle.id.clone(),
                });
            }
            TaskOutcome::Failed { error } => {
                tracing::error!(task_id = %handle.id, error = %error, "Task failed");
                self.manager.emit_event(Event::TaskFailed {
                    id: handle.id.clone(),
                    error: error.clone(),
                });
            }
        }

        self.notify_outcome(&outcome).await;
        self.manager.retire(&handle.id).await;

        outcome
    }
}
