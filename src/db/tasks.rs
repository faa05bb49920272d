//! Task record CRUD operations.

use crate::error::DatabaseError;
use crate::types::{OwnerId, TaskId, TaskState};
use crate::{Error, Result};

use super::{Database, NewTaskRecord, TaskRecord, TaskUpdate};

const TASK_COLUMNS: &str = r#"
    task_id, owner, container, object_id, group_id, display_name, status,
    progress, bytes_transferred, bytes_total, error_message, file_paths,
    skipped, created_at, updated_at
"#;

impl Database {
    /// Insert a new task record in `pending` state
    pub async fn save_task(&self, task: &NewTaskRecord) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO tasks (
                task_id, owner, container, object_id, group_id, display_name,
                status, progress, bytes_transferred, bytes_total, file_paths,
                skipped, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, 0.0, 0, ?, '[]', 0, ?, ?)
            "#,
        )
        .bind(&task.id)
        .bind(task.owner)
        .bind(&task.source.container)
        .bind(task.source.object_id)
        .bind(task.group_id)
        .bind(&task.display_name)
        .bind(TaskState::Pending.as_str())
        .bind(task.bytes_total as i64)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to insert task: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Apply a partial update; returns whether a record was changed
    pub async fn update_task(&self, id: &TaskId, update: &TaskUpdate) -> Result<bool> {
        let now = chrono::Utc::now().timestamp();
        let file_paths = update
            .file_paths
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let result = sqlx::query(
            r#"
            UPDATE tasks SET
                status = COALESCE(?, status),
                progress = COALESCE(?, progress),
                bytes_transferred = COALESCE(?, bytes_transferred),
                bytes_total = COALESCE(?, bytes_total),
                error_message = COALESCE(?, error_message),
                file_paths = COALESCE(?, file_paths),
                skipped = COALESCE(?, skipped),
                updated_at = ?
            WHERE task_id = ?
            "#,
        )
        .bind(update.status.map(|s| s.as_str()))
        .bind(update.progress)
        .bind(update.bytes_transferred.map(|b| b as i64))
        .bind(update.bytes_total.map(|b| b as i64))
        .bind(update.error_message.as_deref())
        .bind(file_paths)
        .bind(update.skipped)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to update task: {}",
                e
            )))
        })?;

        Ok(result.rows_affected() > 0)
    }

    /// Get a task record by ID
    pub async fn get_task(&self, id: &TaskId) -> Result<Option<TaskRecord>> {
        let row = sqlx::query_as::<_, TaskRecord>(&format!(
            "SELECT {} FROM tasks WHERE task_id = ?",
            TASK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get task: {}",
                e
            )))
        })?;

        Ok(row)
    }

    /// List task records, optionally filtered by state and owner, oldest first
    pub async fn list_tasks(
        &self,
        status: Option<TaskState>,
        owner: Option<OwnerId>,
    ) -> Result<Vec<TaskRecord>> {
        let status = status.map(|s| s.as_str());

        let rows = sqlx::query_as::<_, TaskRecord>(&format!(
            r#"
            SELECT {} FROM tasks
            WHERE (?1 IS NULL OR status = ?1)
              AND (?2 IS NULL OR owner = ?2)
            ORDER BY created_at ASC, rowid ASC
            "#,
            TASK_COLUMNS
        ))
        .bind(status)
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list tasks: {}",
                e
            )))
        })?;

        Ok(rows)
    }

    /// Records left `pending`, `running` or `paused` by a previous process
    pub async fn list_unfinished_tasks(&self) -> Result<Vec<TaskRecord>> {
        let rows = sqlx::query_as::<_, TaskRecord>(&format!(
            r#"
            SELECT {} FROM tasks
            WHERE status IN ('pending', 'running', 'paused')
            ORDER BY created_at ASC, rowid ASC
            "#,
            TASK_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list unfinished tasks: {}",
                e
            )))
        })?;

        Ok(rows)
    }

    /// Delete a task record; returns whether it existed
    pub async fn delete_task(&self, id: &TaskId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE task_id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to delete task: {}",
                    e
                )))
            })?;

        Ok(result.rows_affected() > 0)
    }
}
