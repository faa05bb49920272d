//! Download task context -- shared state and owner notices.

use std::sync::Arc;

use crate::notifier::TaskControls;
use crate::progress::render_task_detail;
use crate::types::{TaskOutcome, TaskState};

use super::super::TaskManager;
use super::super::handle::TaskHandle;

/// Which owner notices a task sends on its own
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum NoticePolicy {
    /// Queued and terminal notices
    Announce,
    /// Restart notice, then terminal notice
    Restored,
    /// Nothing; an enclosing batch reports for it
    Silent,
}

/// Shared context for a single download task, reducing parameter passing between helpers.
pub(crate) struct DownloadTaskContext {
    pub(crate) handle: Arc<TaskHandle>,
    pub(crate) manager: TaskManager,
    pub(crate) notice: NoticePolicy,
}

impl DownloadTaskContext {
    /// Tell the owner the task exists, with pause/resume/cancel buttons
    pub(super) async fn announce(&self) {
        let text = match self.notice {
            NoticePolicy::Announce => format!(
                "📥 Queued: {}\n🆔 {}",
                self.handle.display_name, self.handle.id
            ),
            NoticePolicy::Restored => format!(
                "🔄 Resuming after restart: {}\n🆔 {}",
                self.handle.display_name, self.handle.id
            ),
            NoticePolicy::Silent => return,
        };
        let controls = TaskControls::new(self.handle.id.clone());
        self.manager
            .notifier
            .send(self.handle.owner, &text, Some(&controls))
            .await;
    }

    /// Tell the owner how the task ended
    pub(super) async fn notify_outcome(&self, outcome: &TaskOutcome) {
        if self.notice == NoticePolicy::Silent {
            return;
        }
        let name = &self.handle.display_name;
        let (transferred, total) = {
            let status = self.handle.status.lock().await;
            (status.bytes_transferred, status.bytes_total)
        };
        // Where an unfinished transfer stopped
        let stopped_at = |state: TaskState| render_task_detail(state, name, transferred, total, 0.0);
        let text = match outcome {
            TaskOutcome::Completed { path } => {
                format!("✅ Download complete: {}\n📁 {}", name, path.display())
            }
            TaskOutcome::Skipped { path } => {
                format!("⏭️ Already downloaded: {}\n📁 {}", name, path.display())
            }
            TaskOutcome::Cancelled => format!(
                "❌ Download cancelled: {}\n{}",
                name,
                stopped_at(TaskState::Cancelled)
            ),
            TaskOutcome::Failed { error } => format!(
                "💥 Download failed: {}\n{}\n{}",
                name,
                stopped_at(TaskState::Failed),
                error
            ),
        };
        self.manager
            .notifier
            .send(self.handle.owner, &text, None)
            .await;
    }
}
