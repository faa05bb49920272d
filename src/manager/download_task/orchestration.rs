//! Download task orchestration -- admission wait, existence gate, transfer.

use std::path::Path;

use crate::db::TaskUpdate;
use crate::error::TransferError;
use crate::existence::{Action, RedownloadPolicy, decide, find_existing};
use crate::types::{Event, TaskOutcome, TaskState};

use super::context::DownloadTaskContext;
use super::observer::TaskObserver;

/// Run one task from `pending` to a terminal state
pub(crate) async fn run_download_task(ctx: DownloadTaskContext) -> TaskOutcome {
    ctx.announce().await;

    let handle = ctx.handle.clone();
    let admission = ctx.manager.registry.admission.clone();
    let permit = tokio::select! {
        biased;
        _ = handle.cancel.cancelled() => None,
        // The semaphore is never closed, so an error only means no slot
        permit = admission.acquire() => permit.ok(),
    };

    let Some(permit) = permit else {
        return ctx.finalize(TaskOutcome::Cancelled, None).await;
    };

    if !ctx.mark_started().await {
        return ctx.finalize(TaskOutcome::Cancelled, Some(permit)).await;
    }

    let outcome = execute(&ctx).await;
    ctx.finalize(outcome, Some(permit)).await
}

impl DownloadTaskContext {
    /// `pending -> running`; false when the task was cancelled while waiting
    async fn mark_started(&self) -> bool {
        {
            let mut status = self.handle.status.lock().await;
            if self.handle.is_cancelled() || status.state != TaskState::Pending {
                return false;
            }
            status.state = TaskState::Running;
        }

        tracing::info!(task_id = %self.handle.id, "Task started");
        self.manager.emit_event(Event::TaskStarted {
            id: self.handle.id.clone(),
        });
        if let Err(e) = self
            .manager
            .db
            .update_task(&self.handle.id, &TaskUpdate::status(TaskState::Running))
            .await
        {
            tracing::warn!(task_id = %self.handle.id, error = %e, "Failed to persist task start");
        }
        true
    }
}

async fn execute(ctx: &DownloadTaskContext) -> TaskOutcome {
    let handle = &ctx.handle;
    let download = &ctx.manager.config.download;
    let policy = RedownloadPolicy {
        skip_existing: download.skip_existing,
        force_redownload: download.force_redownload,
    };

    let title = ctx
        .manager
        .source
        .container_title(&handle.source.container)
        .await;
    let destination = ctx
        .manager
        .paths
        .resolve(title.as_deref(), &handle.display_name);
    let dir = destination
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| ctx.manager.paths.base().to_path_buf());
    let expected = handle.status.lock().await.bytes_total;
    let object_id = handle.source.object_id;

    let existing = find_existing(&dir, object_id);
    match decide(&existing, expected, policy) {
        Action::Skip(path) => {
            if expected == 0 {
                tracing::debug!(task_id = %handle.id, path = %path.display(), "Expected size unknown, treating existing artifact as complete");
            }
            tracing::info!(task_id = %handle.id, path = %path.display(), "Existing artifact is complete, skipping");
            return TaskOutcome::Skipped { path };
        }
        Action::RemoveStaleAndTransfer(path) => {
            tracing::info!(
                task_id = %handle.id,
                path = %path.display(),
                local_size = existing.size,
                expected,
                "Removing incomplete artifact"
            );
            remove_unless_destination(&path, &destination).await;
        }
        Action::ForceRedownload(path) => {
            tracing::info!(task_id = %handle.id, path = %path.display(), "Forced re-download, removing existing artifact");
            remove_unless_destination(&path, &destination).await;
        }
        Action::Transfer => {}
    }

    // Another task for the same object may have finished while we were deciding
    if policy.skip_existing && !policy.force_redownload {
        let again = find_existing(&dir, object_id);
        if again.is_complete(expected) {
            tracing::info!(task_id = %handle.id, path = %again.path.display(), "Artifact appeared before transfer, skipping");
            return TaskOutcome::Skipped { path: again.path };
        }
    }

    handle.wait_until_open().await;
    if handle.is_cancelled() {
        return TaskOutcome::Cancelled;
    }

    transfer(ctx, &destination).await
}

async fn transfer(ctx: &DownloadTaskContext, destination: &Path) -> TaskOutcome {
    let handle = &ctx.handle;

    if let Some(parent) = destination.parent()
        && let Err(e) = tokio::fs::create_dir_all(parent).await
    {
        return TaskOutcome::Failed {
            error: format!("failed to create {}: {}", parent.display(), e),
        };
    }

    tracing::debug!(task_id = %handle.id, destination = %destination.display(), "Starting transfer");
    let observer = TaskObserver::new(ctx);
    let result = ctx
        .manager
        .source
        .stream_object(&handle.source, destination, &observer)
        .await;

    if handle.is_cancelled() {
        return TaskOutcome::Cancelled;
    }

    match result {
        Ok(path) => TaskOutcome::Completed { path },
        Err(TransferError::Aborted) => TaskOutcome::Cancelled,
        Err(e) => TaskOutcome::Failed {
            error: e.to_string(),
        },
    }
}

/// The destination itself is truncated by the transfer, anything else is deleted
async fn remove_unless_destination(path: &Path, destination: &Path) {
    if path == destination {
        return;
    }
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::warn!(path = %path.display(), error = %e, "Failed to remove existing artifact");
    }
}
