//! Database layer for tgmedia-dl
//!
//! Durable task records for audit and restart recovery. The live registry is
//! the source of truth while a task runs; the database trails it best-effort.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] — Database lifecycle, schema migrations
//! - [`tasks`] — Task record CRUD

use chrono::{TimeZone, Utc};
use sqlx::{FromRow, sqlite::SqlitePool};
use std::path::PathBuf;

use crate::types::{OwnerId, SourceRef, TaskId, TaskInfo, TaskState};

mod migrations;
mod tasks;

/// New task record to be inserted into the database
#[derive(Debug, Clone)]
pub struct NewTaskRecord {
    /// Task identifier
    pub id: TaskId,
    /// Requesting principal
    pub owner: OwnerId,
    /// What is being downloaded
    pub source: SourceRef,
    /// Album membership
    pub group_id: Option<i64>,
    /// `{object_id}_{original_name}`
    pub display_name: String,
    /// Expected size in bytes (0 = unknown)
    pub bytes_total: u64,
}

/// Partial update of a task record; `None` fields are left untouched
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    /// New lifecycle state
    pub status: Option<TaskState>,
    /// Fraction in [0, 1]
    pub progress: Option<f64>,
    /// Bytes written so far
    pub bytes_transferred: Option<u64>,
    /// Expected total bytes
    pub bytes_total: Option<u64>,
    /// Failure description
    pub error_message: Option<String>,
    /// Materialized local paths
    pub file_paths: Option<Vec<PathBuf>>,
    /// Completed by finding an existing artifact
    pub skipped: Option<bool>,
}

impl TaskUpdate {
    /// Update that only changes the state
    pub fn status(status: TaskState) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}

/// Task record from database
#[derive(Debug, Clone, FromRow)]
pub struct TaskRecord {
    /// Task identifier
    pub task_id: TaskId,
    /// Requesting principal
    pub owner: i64,
    /// Chat id or username
    pub container: String,
    /// Message id
    pub object_id: i64,
    /// Album membership
    pub group_id: Option<i64>,
    /// `{object_id}_{original_name}`
    pub display_name: String,
    /// Lifecycle state name (see [`TaskState::as_str`])
    pub status: String,
    /// Fraction in [0, 1]
    pub progress: f64,
    /// Bytes written so far
    pub bytes_transferred: i64,
    /// Expected total bytes
    pub bytes_total: i64,
    /// Failure description
    pub error_message: Option<String>,
    /// JSON array of materialized local paths
    pub file_paths: String,
    /// Completed by finding an existing artifact
    pub skipped: bool,
    /// Unix timestamp when the task was admitted
    pub created_at: i64,
    /// Unix timestamp of the last update
    pub updated_at: i64,
}

impl TaskRecord {
    /// Parsed lifecycle state
    pub fn state(&self) -> TaskState {
        TaskState::from_name(&self.status)
    }

    /// Source reference rebuilt from the stored columns
    pub fn source(&self) -> SourceRef {
        SourceRef::new(self.container.clone(), self.object_id)
    }

    /// Decoded file paths (malformed JSON decodes as empty)
    pub fn paths(&self) -> Vec<PathBuf> {
        serde_json::from_str(&self.file_paths).unwrap_or_default()
    }
}

impl From<TaskRecord> for TaskInfo {
    fn from(record: TaskRecord) -> Self {
        TaskInfo {
            state: record.state(),
            source: record.source(),
            file_paths: record.paths(),
            id: record.task_id,
            owner: record.owner,
            display_name: record.display_name,
            progress: record.progress,
            bytes_transferred: record.bytes_transferred.max(0) as u64,
            bytes_total: record.bytes_total.max(0) as u64,
            speed_bps: 0.0,
            error: record.error_message,
            skipped: record.skipped,
            group_id: record.group_id,
            created_at: Utc
                .timestamp_opt(record.created_at, 0)
                .single()
                .unwrap_or_else(Utc::now),
        }
    }
}

/// Database handle for tgmedia-dl
pub struct Database {
    pool: SqlitePool,
}
