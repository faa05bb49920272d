//! Live per-task state shared between the manager and the transfer loop.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, watch};
use tokio_util::sync::CancellationToken;

use crate::db::TaskRecord;
use crate::types::{OwnerId, SourceRef, TaskId, TaskInfo, TaskState};

/// Mutable part of a task, guarded by one lock
#[derive(Debug, Clone)]
pub(crate) struct TaskStatus {
    pub(crate) state: TaskState,
    pub(crate) progress: f64,
    pub(crate) bytes_transferred: u64,
    pub(crate) bytes_total: u64,
    pub(crate) speed_bps: f64,
    pub(crate) error: Option<String>,
    pub(crate) file_paths: Vec<PathBuf>,
    pub(crate) skipped: bool,
}

impl TaskStatus {
    fn pending(bytes_total: u64) -> Self {
        Self {
            state: TaskState::Pending,
            progress: 0.0,
            bytes_transferred: 0,
            bytes_total,
            speed_bps: 0.0,
            error: None,
            file_paths: Vec::new(),
            skipped: false,
        }
    }
}

/// A registered task
///
/// Identity fields never change. `status` is written by the manager's control
/// operations and by the task's own transfer loop. The pause gate is a
/// `watch` flag (`true` = open); the cancel token is one-way.
pub(crate) struct TaskHandle {
    pub(crate) id: TaskId,
    /// Admission order, used to list tasks oldest first
    pub(crate) seq: u64,
    pub(crate) source: SourceRef,
    pub(crate) owner: OwnerId,
    pub(crate) display_name: String,
    pub(crate) group_id: Option<i64>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) status: Mutex<TaskStatus>,
    pause_gate: watch::Sender<bool>,
    pub(crate) cancel: CancellationToken,
}

/// Everything needed to register a task
pub(crate) struct NewTask {
    pub(crate) id: TaskId,
    pub(crate) seq: u64,
    pub(crate) source: SourceRef,
    pub(crate) owner: OwnerId,
    pub(crate) display_name: String,
    pub(crate) group_id: Option<i64>,
    pub(crate) bytes_total: u64,
    pub(crate) created_at: DateTime<Utc>,
}

impl NewTask {
    /// Rebuild a task from a record left unfinished by a previous process
    pub(crate) fn from_record(record: &TaskRecord, seq: u64) -> Self {
        Self {
            id: record.task_id.clone(),
            seq,
            source: record.source(),
            owner: record.owner,
            display_name: record.display_name.clone(),
            group_id: record.group_id,
            bytes_total: record.bytes_total.max(0) as u64,
            created_at: DateTime::from_timestamp(record.created_at, 0).unwrap_or_else(Utc::now),
        }
    }
}

impl TaskHandle {
    pub(crate) fn new(new_task: NewTask) -> Self {
        let (pause_gate, _) = watch::channel(true);
        Self {
            id: new_task.id,
            seq: new_task.seq,
            source: new_task.source,
            owner: new_task.owner,
            display_name: new_task.display_name,
            group_id: new_task.group_id,
            created_at: new_task.created_at,
            status: Mutex::new(TaskStatus::pending(new_task.bytes_total)),
            pause_gate,
            cancel: CancellationToken::new(),
        }
    }

    pub(crate) async fn state(&self) -> TaskState {
        self.status.lock().await.state
    }

    pub(crate) async fn snapshot(&self) -> TaskInfo {
        let status = self.status.lock().await.clone();
        TaskInfo {
            id: self.id.clone(),
            source: self.source.clone(),
            owner: self.owner,
            display_name: self.display_name.clone(),
            state: status.state,
            progress: status.progress,
            bytes_transferred: status.bytes_transferred,
            bytes_total: status.bytes_total,
            speed_bps: status.speed_bps,
            error: status.error,
            file_paths: status.file_paths,
            skipped: status.skipped,
            group_id: self.group_id,
            created_at: self.created_at,
        }
    }

    pub(crate) fn close_gate(&self) {
        self.pause_gate.send_replace(false);
    }

    pub(crate) fn open_gate(&self) {
        self.pause_gate.send_replace(true);
    }

    pub(crate) fn is_gate_open(&self) -> bool {
        *self.pause_gate.borrow()
    }

    /// Park until the pause gate is open
    pub(crate) async fn wait_until_open(&self) {
        let mut gate = self.pause_gate.subscribe();
        // The sender lives in self, so the channel cannot close while we wait
        let _ = gate.wait_for(|open| *open).await;
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
