//! Core types for tgmedia-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use utoipa::ToSchema;

/// Identity of the principal that requested a download (a chat user id)
pub type OwnerId = i64;

/// Unique identifier for a download task
///
/// Generated as `task_{counter}_{unix_seconds}`. The counter is process-local,
/// the timestamp suffix keeps ids unique across restarts.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    /// Build an id from an admission counter and the current time
    pub fn generate(counter: u64) -> Self {
        Self(format!("task_{}_{}", counter, Utc::now().timestamp()))
    }

    /// Borrow the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// Implement sqlx Type, Encode, and Decode for database operations
impl sqlx::Type<sqlx::Sqlite> for TaskId {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <String as sqlx::Type<sqlx::Sqlite>>::type_info()
    }

    fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for TaskId {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        sqlx::Encode::<sqlx::Sqlite>::encode_by_ref(&self.0, buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for TaskId {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let id = <String as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        Ok(Self(id))
    }
}

/// Reference to a media object inside the messaging service
///
/// `container` is either a numeric chat id (`-1001234567890`) or a public
/// username (`somechannel`); `object_id` is the message id within it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct SourceRef {
    /// Chat id or public username
    pub container: String,
    /// Message id within the container
    pub object_id: i64,
}

impl SourceRef {
    /// Create a new source reference
    pub fn new(container: impl Into<String>, object_id: i64) -> Self {
        Self {
            container: container.into(),
            object_id,
        }
    }
}

impl std::fmt::Display for SourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.container, self.object_id)
    }
}

/// Task lifecycle state
///
/// `Cancelled`, `Completed` and `Failed` are terminal and sticky.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// Admitted, waiting for a concurrency slot
    Pending,
    /// Transferring (or deciding whether to transfer)
    Running,
    /// Paused by the owner; the transfer loop is parked on the pause gate
    Paused,
    /// Cancelled by the owner
    Cancelled,
    /// Finished, artifact on disk
    Completed,
    /// Transfer failed
    Failed,
}

impl TaskState {
    /// Whether the state can never change again
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Cancelled | TaskState::Completed | TaskState::Failed
        )
    }

    /// Stable lowercase name, used for persistence and display
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Pending => "pending",
            TaskState::Running => "running",
            TaskState::Paused => "paused",
            TaskState::Cancelled => "cancelled",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
        }
    }

    /// Parse a persisted state name (unknown names map to `Failed`)
    pub fn from_name(name: &str) -> Self {
        match name {
            "pending" => TaskState::Pending,
            "running" => TaskState::Running,
            "paused" => TaskState::Paused,
            "cancelled" => TaskState::Cancelled,
            "completed" => TaskState::Completed,
            _ => TaskState::Failed,
        }
    }

    /// Emoji used in chat progress messages
    pub fn emoji(&self) -> &'static str {
        match self {
            TaskState::Running => "⏬",
            TaskState::Paused => "⏸️",
            TaskState::Cancelled => "❌",
            TaskState::Completed => "✅",
            TaskState::Failed => "💥",
            TaskState::Pending => "❓",
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata the media source reports for an object
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ObjectMetadata {
    /// Original file name, if the object carries one
    pub name: Option<String>,
    /// Expected size in bytes (0 = unknown)
    pub size: u64,
    /// Album identifier shared by grouped objects
    pub group_id: Option<i64>,
}

/// Snapshot of a task's state, safe to hand to callers
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct TaskInfo {
    /// Task identifier
    pub id: TaskId,
    /// What is being downloaded
    pub source: SourceRef,
    /// Requesting principal
    pub owner: OwnerId,
    /// `{object_id}_{original_name}`
    pub display_name: String,
    /// Current state
    pub state: TaskState,
    /// Fraction in [0, 1]
    pub progress: f64,
    /// Bytes written so far
    pub bytes_transferred: u64,
    /// Expected total bytes (0 = unknown)
    pub bytes_total: u64,
    /// Most recent transfer rate in bytes per second
    pub speed_bps: f64,
    /// Last failure description (only in `failed`)
    pub error: Option<String>,
    /// Materialized local paths
    #[schema(value_type = Vec<String>)]
    pub file_paths: Vec<PathBuf>,
    /// Completed by finding an existing complete artifact
    pub skipped: bool,
    /// Album membership
    pub group_id: Option<i64>,
    /// When the task was admitted
    pub created_at: DateTime<Utc>,
}

/// Terminal result of a single task
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TaskOutcome {
    /// Bytes were transferred and the artifact is complete
    Completed {
        /// Artifact location
        #[schema(value_type = String)]
        path: PathBuf,
    },
    /// A complete artifact already existed; nothing was transferred
    Skipped {
        /// Existing artifact location
        #[schema(value_type = String)]
        path: PathBuf,
    },
    /// Cancelled before completion
    Cancelled,
    /// Transfer failed
    Failed {
        /// Failure description
        error: String,
    },
}

/// Aggregate result of a batch (album) or single download
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BatchSummary {
    /// Members that transferred new bytes
    pub new: usize,
    /// Members satisfied by an existing artifact
    pub skipped: usize,
    /// Members that failed, were cancelled, or could not be admitted
    pub failed: usize,
}

impl BatchSummary {
    /// Fold one member outcome into the summary
    pub fn record(&mut self, outcome: &TaskOutcome) {
        match outcome {
            TaskOutcome::Completed { .. } => self.new += 1,
            TaskOutcome::Skipped { .. } => self.skipped += 1,
            TaskOutcome::Cancelled | TaskOutcome::Failed { .. } => self.failed += 1,
        }
    }

    /// Number of members accounted for
    pub fn total(&self) -> usize {
        self.new + self.skipped + self.failed
    }

    /// Every member was already on disk
    pub fn all_skipped(&self) -> bool {
        self.total() > 0 && self.skipped == self.total()
    }
}

/// Result of [`TaskManager::download`](crate::TaskManager::download)
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DownloadReport {
    /// Tasks that were admitted, in member order
    pub task_ids: Vec<TaskId>,
    /// Album id when the object was part of a group
    pub group_id: Option<i64>,
    /// Aggregated outcome
    pub summary: BatchSummary,
}

/// One file that is absent or incomplete on disk
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MissingFile {
    /// Message id
    pub object_id: i64,
    /// `{object_id}_{original_name}`
    pub display_name: String,
    /// Size found on disk (0 when absent)
    pub local_size: u64,
    /// Size reported by the source
    pub expected_size: u64,
}

/// Completeness of an object (or its album) on local storage
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CompletenessReport {
    /// What was checked
    pub source: SourceRef,
    /// Album id when the object is grouped
    pub group_id: Option<i64>,
    /// Number of files the object consists of
    pub total_files: usize,
    /// Number of complete files on disk
    pub downloaded_files: usize,
    /// Bytes held by complete files
    pub downloaded_bytes: u64,
    /// Bytes expected across all files
    pub expected_bytes: u64,
    /// Files that are absent or partial
    pub missing: Vec<MissingFile>,
}

impl CompletenessReport {
    /// Every file is present and complete
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Event emitted during the task lifecycle
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Task admitted and registered
    TaskQueued {
        /// Task ID
        id: TaskId,
        /// Display name
        name: String,
        /// Requesting principal
        owner: OwnerId,
    },

    /// Task acquired a concurrency slot
    TaskStarted {
        /// Task ID
        id: TaskId,
    },

    /// Transfer progress
    TaskProgress {
        /// Task ID
        id: TaskId,
        /// Progress percentage (0.0 to 100.0)
        percent: f64,
        /// Bytes written so far
        bytes_transferred: u64,
        /// Expected total bytes
        bytes_total: u64,
        /// Current speed in bytes per second
        speed_bps: f64,
    },

    /// Task paused
    TaskPaused {
        /// Task ID
        id: TaskId,
    },

    /// Task resumed
    TaskResumed {
        /// Task ID
        id: TaskId,
    },

    /// Transfer finished
    TaskCompleted {
        /// Task ID
        id: TaskId,
        /// Artifact location
        #[schema(value_type = String)]
        path: PathBuf,
    },

    /// Existing artifact satisfied the request
    TaskSkipped {
        /// Task ID
        id: TaskId,
        /// Existing artifact location
        #[schema(value_type = String)]
        path: PathBuf,
    },

    /// Task cancelled
    TaskCancelled {
        /// Task ID
        id: TaskId,
    },

    /// Task failed
    TaskFailed {
        /// Task ID
        id: TaskId,
        /// Failure description
        error: String,
    },

    /// Task re-registered from the database after a restart
    TaskRestored {
        /// Task ID
        id: TaskId,
    },

    /// Album finished
    BatchCompleted {
        /// Album id
        group_id: i64,
        /// Aggregated outcome
        summary: BatchSummary,
    },

    /// Admission bound changed at runtime
    ConcurrencyChanged {
        /// New bound
        limit: usize,
    },

    /// Graceful shutdown initiated
    Shutdown,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_carry_counter_and_timestamp() {
        let id = TaskId::generate(7);
        let parts: Vec<&str> = id.as_str().split('_').collect();

        assert_eq!(parts.len(), 3, "id should be task_<n>_<ts>: {id}");
        assert_eq!(parts[0], "task");
        assert_eq!(parts[1], "7");
        assert!(parts[2].parse::<i64>().is_ok(), "timestamp suffix is numeric");
    }

    #[test]
    fn only_cancelled_completed_failed_are_terminal() {
        let terminal: Vec<TaskState> = [
            TaskState::Pending,
            TaskState::Running,
            TaskState::Paused,
            TaskState::Cancelled,
            TaskState::Completed,
            TaskState::Failed,
        ]
        .into_iter()
        .filter(TaskState::is_terminal)
        .collect();

        assert_eq!(
            terminal,
            vec![TaskState::Cancelled, TaskState::Completed, TaskState::Failed]
        );
    }

    #[test]
    fn state_names_survive_persistence() {
        for state in [
            TaskState::Pending,
            TaskState::Running,
            TaskState::Paused,
            TaskState::Cancelled,
            TaskState::Completed,
            TaskState::Failed,
        ] {
            assert_eq!(TaskState::from_name(state.as_str()), state);
        }
        assert_eq!(TaskState::from_name("garbage"), TaskState::Failed);
    }

    #[test]
    fn batch_summary_counts_cancelled_as_failed() {
        let mut summary = BatchSummary::default();
        summary.record(&TaskOutcome::Completed {
            path: PathBuf::from("a"),
        });
        summary.record(&TaskOutcome::Skipped {
            path: PathBuf::from("b"),
        });
        summary.record(&TaskOutcome::Cancelled);
        summary.record(&TaskOutcome::Failed {
            error: "boom".into(),
        });

        assert_eq!(summary.new, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.total(), 4);
        assert!(!summary.all_skipped());
    }

    #[test]
    fn all_skipped_requires_at_least_one_member() {
        assert!(!BatchSummary::default().all_skipped());
        let summary = BatchSummary {
            new: 0,
            skipped: 3,
            failed: 0,
        };
        assert!(summary.all_skipped());
    }

    #[test]
    fn event_serializes_with_snake_case_tag() {
        let json = serde_json::to_value(Event::TaskCancelled {
            id: TaskId::from("task_1_0"),
        })
        .unwrap();
        assert_eq!(json["type"], "task_cancelled");
        assert_eq!(json["id"], "task_1_0");
    }
}
