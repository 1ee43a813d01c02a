//! Tasks repository for database operations.
//!
//! # Security
//!
//! - All queries use parameterized statements (SQL injection safe)
//! - Task contents are not logged

use crate::errors::TsError;
use crate::models::{Task, TaskPriority, TaskStatus};
use crate::observability::metrics;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use std::time::Instant;
use tracing::instrument;
use uuid::Uuid;

/// Raw row; status and priority are validated on conversion.
#[derive(Debug, FromRow)]
struct TaskRow {
    id: String,
    title: String,
    description: Option<String>,
    status: String,
    priority: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TaskRow> for Task {
    type Error = TsError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&row.id)
            .map_err(|e| TsError::Database(format!("stored task id is not a UUID: {e}")))?;
        let status = TaskStatus::parse(&row.status)
            .ok_or_else(|| TsError::Database(format!("unknown stored status: {}", row.status)))?;
        let priority = TaskPriority::parse(&row.priority).ok_or_else(|| {
            TsError::Database(format!("unknown stored priority: {}", row.priority))
        })?;

        Ok(Task {
            id,
            title: row.title,
            description: row.description,
            status,
            priority,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn record<T>(operation: &str, result: &Result<T, sqlx::Error>, start: Instant) {
    let status = if result.is_ok() { "success" } else { "error" };
    metrics::record_db_query(operation, status, start.elapsed());
}

/// Repository for task operations.
pub struct TasksRepository;

impl TasksRepository {
    /// Insert a new task.
    ///
    /// # Errors
    ///
    /// Returns `TsError::Database` on database failures.
    #[instrument(skip_all, fields(task_id = %task.id))]
    pub async fn insert(pool: &SqlitePool, task: &Task) -> Result<(), TsError> {
        let start = Instant::now();

        let result = sqlx::query(
            r#"
            INSERT INTO tasks (id, title, description, status, priority, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(task.id.to_string())
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.as_str())
        .bind(task.priority.as_str())
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(pool)
        .await;

        record("insert_task", &result, start);
        result?;

        tracing::debug!(target: "ts.repository.tasks", task_id = %task.id, "Task created");
        Ok(())
    }

    /// List every task, newest first.
    #[instrument(skip_all)]
    pub async fn list(pool: &SqlitePool) -> Result<Vec<Task>, TsError> {
        let start = Instant::now();

        let result: Result<Vec<TaskRow>, _> = sqlx::query_as(
            r#"
            SELECT id, title, description, status, priority, created_at, updated_at
            FROM tasks
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .fetch_all(pool)
        .await;

        record("list_tasks", &result, start);
        result?.into_iter().map(Task::try_from).collect()
    }

    /// Find a task by id.
    #[instrument(skip_all, fields(task_id = %id))]
    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Task>, TsError> {
        let start = Instant::now();

        let result: Result<Option<TaskRow>, _> = sqlx::query_as(
            r#"
            SELECT id, title, description, status, priority, created_at, updated_at
            FROM tasks
            WHERE id = $1
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(pool)
        .await;

        record("find_task", &result, start);
        result?.map(Task::try_from).transpose()
    }

    /// Overwrite the mutable fields of an existing task.
    ///
    /// # Returns
    ///
    /// Returns `true` if a row was updated, `false` if the task does not exist.
    #[instrument(skip_all, fields(task_id = %task.id))]
    pub async fn update(pool: &SqlitePool, task: &Task) -> Result<bool, TsError> {
        let start = Instant::now();

        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET
                title = $2,
                description = $3,
                status = $4,
                priority = $5,
                updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(task.id.to_string())
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.as_str())
        .bind(task.priority.as_str())
        .bind(task.updated_at)
        .execute(pool)
        .await;

        record("update_task", &result, start);
        Ok(result?.rows_affected() > 0)
    }

    /// Delete a task.
    ///
    /// # Returns
    ///
    /// Returns `true` if a row was deleted, `false` if the task does not exist.
    #[instrument(skip_all, fields(task_id = %id))]
    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<bool, TsError> {
        let start = Instant::now();

        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id.to_string())
            .execute(pool)
            .await;

        record("delete_task", &result, start);
        let deleted = result?.rows_affected() > 0;

        if deleted {
            tracing::debug!(target: "ts.repository.tasks", task_id = %id, "Task deleted");
        }
        Ok(deleted)
    }
}
