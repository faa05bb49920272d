//! Admission of single objects.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use chrono::Utc;
use tokio::task::JoinHandle;

use crate::db::NewTaskRecord;
use crate::error::{Error, Result};
use crate::paths::sanitize_component;
use crate::types::{Event, ObjectMetadata, OwnerId, SourceRef, TaskId, TaskOutcome};

use super::TaskManager;
use super::download_task::{DownloadTaskContext, NoticePolicy, run_download_task};
use super::handle::{NewTask, TaskHandle};

/// An admitted task together with a handle to its eventual outcome
#[derive(Debug)]
pub struct TaskTicket {
    /// The admitted task
    pub id: TaskId,
    join: JoinHandle<TaskOutcome>,
}

impl TaskTicket {
    /// Wait for the task to reach a terminal state
    pub async fn wait(self) -> TaskOutcome {
        match self.join.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(task_id = %self.id, error = %e, "Task runner panicked");
                TaskOutcome::Failed {
                    error: format!("task runner aborted: {}", e),
                }
            }
        }
    }
}

/// `{object_id}_{original_name}`, or `{object_id}_file_{object_id}` when unnamed
pub(crate) fn display_name_for(object_id: i64, name: Option<&str>) -> String {
    let original = name
        .map(sanitize_component)
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| format!("file_{}", object_id));
    format!("{}_{}", object_id, original)
}

impl TaskManager {
    /// Submit one object for download
    ///
    /// Fetches the object's metadata, registers a `pending` task and schedules
    /// it. Returns as soon as the task is registered; it does not wait for a
    /// concurrency slot.
    ///
    /// # Errors
    ///
    /// - [`Error::ShuttingDown`] once [`shutdown`](Self::shutdown) has started
    /// - [`Error::NotFound`] when the source does not know the object
    /// - [`Error::Source`] when the metadata query itself failed
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use tgmedia_dl::*;
    /// # async fn example(manager: TaskManager) -> Result<()> {
    /// let id = manager.submit(SourceRef::new("somechannel", 42), 1001).await?;
    /// println!("queued {}", id);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn submit(&self, source: SourceRef, owner: OwnerId) -> Result<TaskId> {
        Ok(self.submit_with_handle(source, owner).await?.id)
    }

    /// Like [`submit`](Self::submit), but also returns a handle to await the outcome
    pub async fn submit_with_handle(&self, source: SourceRef, owner: OwnerId) -> Result<TaskTicket> {
        self.ensure_accepting()?;
        let metadata = self.fetch_metadata(&source).await?;
        self.admit(source, owner, &metadata, NoticePolicy::Announce)
            .await
    }

    pub(crate) fn ensure_accepting(&self) -> Result<()> {
        if !self.registry.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }
        Ok(())
    }

    pub(crate) async fn fetch_metadata(&self, source: &SourceRef) -> Result<ObjectMetadata> {
        self.source
            .fetch_object_metadata(source)
            .await?
            .ok_or_else(|| Error::NotFound(format!("object {}", source)))
    }

    fn next_task_id(&self) -> (TaskId, u64) {
        let seq = self.registry.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        (TaskId::generate(seq), seq)
    }

    /// Register a task for an object whose metadata is known and schedule it
    pub(crate) async fn admit(
        &self,
        source: SourceRef,
        owner: OwnerId,
        metadata: &ObjectMetadata,
        notice: NoticePolicy,
    ) -> Result<TaskTicket> {
        self.ensure_accepting()?;

        let (id, seq) = self.next_task_id();
        let new_task = NewTask {
            id: id.clone(),
            seq,
            display_name: display_name_for(source.object_id, metadata.name.as_deref()),
            source,
            owner,
            group_id: metadata.group_id,
            bytes_total: metadata.size,
            created_at: Utc::now(),
        };

        let record = NewTaskRecord {
            id: new_task.id.clone(),
            owner: new_task.owner,
            source: new_task.source.clone(),
            group_id: new_task.group_id,
            display_name: new_task.display_name.clone(),
            bytes_total: new_task.bytes_total,
        };
        if let Err(e) = self.db.save_task(&record).await {
            tracing::warn!(task_id = %id, error = %e, "Failed to persist new task");
        }

        let handle = Arc::new(TaskHandle::new(new_task));
        self.register(handle.clone()).await;

        tracing::info!(
            task_id = %id,
            source = %handle.source,
            owner,
            name = %handle.display_name,
            size = metadata.size,
            "Task admitted"
        );
        self.emit_event(Event::TaskQueued {
            id: id.clone(),
            name: handle.display_name.clone(),
            owner,
        });

        let join = self.spawn_task(handle, notice);
        Ok(TaskTicket { id, join })
    }

    pub(crate) async fn register(&self, handle: Arc<TaskHandle>) {
        let mut tasks = self.registry.tasks.lock().await;
        tasks.insert(handle.id.clone(), handle);
    }

    pub(crate) fn spawn_task(
        &self,
        handle: Arc<TaskHandle>,
        notice: NoticePolicy,
    ) -> JoinHandle<TaskOutcome> {
        let ctx = DownloadTaskContext {
            handle,
            manager: self.clone(),
            notice,
        };
        tokio::spawn(run_download_task(ctx))
    }
}
