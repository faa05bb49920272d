//! Task lifecycle control: pause, resume, cancel, bulk variants, retire, purge.

use std::sync::Arc;

use crate::db::TaskUpdate;
use crate::error::{Error, Result, TaskError};
use crate::types::{Event, OwnerId, TaskId, TaskInfo, TaskState};

use super::TaskManager;
use super::handle::TaskHandle;

impl TaskManager {
    /// Pause a running task
    ///
    /// Closes the task's pause gate; the transfer parks at its next progress
    /// callback and keeps its bytes. Only `running` tasks can be paused.
    ///
    /// Returns `false` for unknown ids and for tasks in any other state.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use tgmedia_dl::*;
    /// # async fn example(manager: TaskManager, id: TaskId) {
    /// if manager.pause(&id).await {
    ///     println!("paused {}", id);
    /// }
    /// # }
    /// ```
    pub async fn pause(&self, id: &TaskId) -> bool {
        match self.live_handle(id).await {
            Some(handle) => self.pause_handle(&handle).await,
            None => false,
        }
    }

    /// Resume a paused task
    ///
    /// Returns `false` for unknown ids and for tasks that are not `paused`.
    pub async fn resume(&self, id: &TaskId) -> bool {
        match self.live_handle(id).await {
            Some(handle) => self.resume_handle(&handle).await,
            None => false,
        }
    }

    /// Cancel a running or paused task
    ///
    /// Sets the cancel flag and opens the pause gate so a parked transfer wakes
    /// up and observes it. The task ends `cancelled` even if every byte already
    /// arrived.
    ///
    /// Returns `false` for unknown ids and for tasks that are `pending` or terminal.
    pub async fn cancel(&self, id: &TaskId) -> bool {
        match self.live_handle(id).await {
            Some(handle) => self.cancel_handle(&handle).await,
            None => false,
        }
    }

    /// Pause every running task; returns how many were paused
    pub async fn pause_all(&self) -> usize {
        let mut count = 0;
        for handle in self.live_handles(None).await {
            if self.pause_handle(&handle).await {
                count += 1;
            }
        }
        count
    }

    /// Resume every paused task; returns how many were resumed
    pub async fn resume_all(&self) -> usize {
        let mut count = 0;
        for handle in self.live_handles(None).await {
            if self.resume_handle(&handle).await {
                count += 1;
            }
        }
        count
    }

    /// Cancel every running or paused task; returns how many were cancelled
    pub async fn cancel_all(&self) -> usize {
        let mut count = 0;
        for handle in self.live_handles(None).await {
            if self.cancel_handle(&handle).await {
                count += 1;
            }
        }
        count
    }

    /// Pause every running task of `owner`
    pub async fn pause_owner(&self, owner: OwnerId) -> usize {
        let mut count = 0;
        for handle in self.live_handles(Some(owner)).await {
            if self.pause_handle(&handle).await {
                count += 1;
            }
        }
        count
    }

    /// Resume every paused task of `owner`
    pub async fn resume_owner(&self, owner: OwnerId) -> usize {
        let mut count = 0;
        for handle in self.live_handles(Some(owner)).await {
            if self.resume_handle(&handle).await {
                count += 1;
            }
        }
        count
    }

    /// Cancel every running or paused task of `owner`
    pub async fn cancel_owner(&self, owner: OwnerId) -> usize {
        let mut count = 0;
        for handle in self.live_handles(Some(owner)).await {
            if self.cancel_handle(&handle).await {
                count += 1;
            }
        }
        count
    }

    /// Remove a terminal task from the live registry
    ///
    /// The durable record stays. Returns `false` for unknown ids and for tasks
    /// that have not reached a terminal state.
    pub async fn retire(&self, id: &TaskId) -> bool {
        let mut tasks = self.registry.tasks.lock().await;
        let Some(handle) = tasks.get(id) else {
            return false;
        };
        if !handle.state().await.is_terminal() {
            return false;
        }
        tasks.remove(id);
        tracing::debug!(task_id = %id, "Task retired from registry");
        true
    }

    /// Delete the durable record of a task that is no longer live
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::InvalidState`] while the task is still in the live
    /// registry with a non-terminal state.
    pub async fn purge(&self, id: &TaskId) -> Result<bool> {
        if let Some(handle) = self.live_handle(id).await {
            let state = handle.state().await;
            if !state.is_terminal() {
                return Err(Error::Task(TaskError::InvalidState {
                    id: id.clone(),
                    operation: "purge".to_string(),
                    current_state: state.as_str().to_string(),
                }));
            }
        }
        let removed = self.db.delete_task(id).await?;
        if removed {
            tracing::info!(task_id = %id, "Task record purged");
        }
        Ok(removed)
    }

    /// Snapshot of a task
    ///
    /// Live tasks are read from the registry; retired ones from their durable
    /// record. `None` when neither knows the id.
    pub async fn get_task(&self, id: &TaskId) -> Option<TaskInfo> {
        if let Some(handle) = self.live_handle(id).await {
            return Some(handle.snapshot().await);
        }
        match self.db.get_task(id).await {
            Ok(record) => record.map(TaskInfo::from),
            Err(e) => {
                tracing::warn!(task_id = %id, error = %e, "Failed to read task record");
                None
            }
        }
    }

    /// Snapshots of live tasks, oldest first, optionally for one owner only
    pub async fn list_tasks(&self, owner: Option<OwnerId>) -> Vec<TaskInfo> {
        let mut infos = Vec::new();
        for handle in self.live_handles(owner).await {
            infos.push(handle.snapshot().await);
        }
        infos
    }

    pub(crate) async fn live_handle(&self, id: &TaskId) -> Option<Arc<TaskHandle>> {
        self.registry.tasks.lock().await.get(id).cloned()
    }

    /// Registered handles in admission order
    pub(crate) async fn live_handles(&self, owner: Option<OwnerId>) -> Vec<Arc<TaskHandle>> {
        let mut handles: Vec<_> = {
            let tasks = self.registry.tasks.lock().await;
            tasks
                .values()
                .filter(|handle| owner.is_none_or(|owner| handle.owner == owner))
                .cloned()
                .collect()
        };
        handles.sort_by_key(|handle| handle.seq);
        handles
    }

    async fn pause_handle(&self, handle: &TaskHandle) -> bool {
        {
            let mut status = handle.status.lock().await;
            if status.state != TaskState::Running {
                return false;
            }
            status.state = TaskState::Paused;
            status.speed_bps = 0.0;
            handle.close_gate();
        }

        tracing::info!(task_id = %handle.id, "Task paused");
        self.persist_state(&handle.id, TaskState::Paused).await;
        self.emit_event(Event::TaskPaused {
            id: handle.id.clone(),
        });
        true
    }

    async fn resume_handle(&self, handle: &TaskHandle) -> bool {
        {
            let mut status = handle.status.lock().await;
            if status.state != TaskState::Paused {
                return false;
            }
            status.state = TaskState::Running;
            handle.open_gate();
        }

        tracing::info!(task_id = %handle.id, "Task resumed");
        self.persist_state(&handle.id, TaskState::Running).await;
        self.emit_event(Event::TaskResumed {
            id: handle.id.clone(),
        });
        true
    }

    async fn cancel_handle(&self, handle: &TaskHandle) -> bool {
        {
            let mut status = handle.status.lock().await;
            if !matches!(status.state, TaskState::Running | TaskState::Paused) {
                return false;
            }
            status.state = TaskState::Cancelled;
            handle.cancel.cancel();
            handle.open_gate();
        }

        tracing::info!(task_id = %handle.id, "Task cancellation requested");
        true
    }

    /// Cancel regardless of state, pending tasks included (shutdown path)
    pub(crate) async fn force_cancel(&self, handle: &TaskHandle) -> bool {
        let mut status = handle.status.lock().await;
        if status.state.is_terminal() {
            return false;
        }
        status.state = TaskState::Cancelled;
        handle.cancel.cancel();
        handle.open_gate();
        true
    }

    async fn persist_state(&self, id: &TaskId, state: TaskState) {
        if let Err(e) = self.db.update_task(id, &TaskUpdate::status(state)).await {
            tracing::warn!(task_id = %id, error = %e, state = state.as_str(), "Failed to persist task state");
        }
    }
}
