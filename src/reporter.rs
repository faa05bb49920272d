//! Per-owner aggregate progress messages
//!
//! Each owner has at most one live progress message. A refresh replaces it
//! (delete, then send) so the newest status sits at the bottom of the chat.
//! Every call goes through the [`Notifier`], and with it the rate limiter.

use std::collections::{BTreeMap, HashMap};

use tokio::sync::Mutex;

use crate::notifier::{MessageRef, Notifier};
use crate::progress::render_task_line;
use crate::types::{OwnerId, TaskInfo};

/// Text shown once an owner has nothing left in flight
pub const ALL_COMPLETE_TEXT: &str = "✅ All downloads complete";

struct LiveMessage {
    message: MessageRef,
    text: String,
}

/// Keeps one progress message per owner up to date
pub struct ProgressReporter {
    notifier: Notifier,
    live: Mutex<HashMap<OwnerId, LiveMessage>>,
}

impl ProgressReporter {
    /// Create a reporter that talks through `notifier`
    pub fn new(notifier: Notifier) -> Self {
        Self {
            notifier,
            live: Mutex::new(HashMap::new()),
        }
    }

    /// Owners that currently have a live progress message
    pub async fn tracked_owners(&self) -> Vec<OwnerId> {
        let mut owners: Vec<_> = self.live.lock().await.keys().copied().collect();
        owners.sort_unstable();
        owners
    }

    /// Refresh every owner from a snapshot of active tasks
    ///
    /// Owners present in the snapshot get a fresh message; tracked owners
    /// missing from it get the "all complete" notice.
    pub async fn refresh(&self, active: &[TaskInfo]) {
        let mut by_owner: BTreeMap<OwnerId, Vec<&TaskInfo>> = BTreeMap::new();
        for task in active {
            by_owner.entry(task.owner).or_default().push(task);
        }

        for owner in self.tracked_owners().await {
            by_owner.entry(owner).or_default();
        }

        for (owner, tasks) in by_owner {
            self.refresh_owner(owner, &tasks).await;
        }
    }

    /// Refresh one owner's message from their active tasks
    pub async fn refresh_owner(&self, owner: OwnerId, tasks: &[&TaskInfo]) {
        let mut live = self.live.lock().await;

        if tasks.is_empty() {
            if let Some(previous) = live.remove(&owner) {
                self.notifier
                    .edit(previous.message, ALL_COMPLETE_TEXT, None)
                    .await;
                tracing::debug!(owner, "Progress message finalized");
            }
            return;
        }

        let text = render_summary(tasks);
        if live.get(&owner).is_some_and(|current| current.text == text) {
            return;
        }

        if let Some(previous) = live.remove(&owner) {
            self.notifier.delete(previous.message).await;
        }

        if let Some(message) = self.notifier.send(owner, &text, None).await {
            live.insert(owner, LiveMessage { message, text });
        }
    }
}

/// Message body listing each task on its own line
pub fn render_summary(tasks: &[&TaskInfo]) -> String {
    let mut text = format!("📊 Downloads ({} active)", tasks.len());
    for task in tasks {
        text.push('\n');
        text.push_str(&render_task_line(
            task.state,
            &task.display_name,
            task.progress,
            task.speed_bps,
        ));
    }
    text
}
