//! Task business logic: input validation and not-found handling on top of
//! [`TasksRepository`].

use crate::errors::TsError;
use crate::models::{CreateTaskRequest, Task, UpdateTaskRequest};
use crate::repositories::TasksRepository;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

const TASK_NOT_FOUND: &str = "task not found";

/// Parse a task id from a path segment.
pub fn parse_task_id(raw: &str) -> Result<Uuid, TsError> {
    Uuid::parse_str(raw).map_err(|_| TsError::BadRequest(format!("invalid task id: {raw}")))
}

fn require_title(title: &str) -> Result<String, TsError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(TsError::BadRequest("title is required".to_string()));
    }
    Ok(trimmed.to_string())
}

/// Create a task; status and priority default to `to_do` and `low`.
pub async fn create_task(pool: &SqlitePool, request: CreateTaskRequest) -> Result<Task, TsError> {
    let title = require_title(&request.title)?;
    let now = Utc::now();

    let task = Task {
        id: Uuid::new_v4(),
        title,
        description: request.description.filter(|d| !d.is_empty()),
        status: request.status.unwrap_or_default(),
        priority: request.priority.unwrap_or_default(),
        created_at: now,
        updated_at: now,
    };

    TasksRepository::insert(pool, &task).await?;
    Ok(task)
}

pub async fn list_tasks(pool: &SqlitePool) -> Result<Vec<Task>, TsError> {
    TasksRepository::list(pool).await
}

pub async fn get_task(pool: &SqlitePool, id: &str) -> Result<Task, TsError> {
    let id = parse_task_id(id)?;
    TasksRepository::find_by_id(pool, id)
        .await?
        .ok_or_else(|| TsError::NotFound(TASK_NOT_FOUND.to_string()))
}

/// Apply a partial update and refresh `updated_at`.
pub async fn update_task(
    pool: &SqlitePool,
    id: &str,
    request: UpdateTaskRequest,
) -> Result<Task, TsError> {
    let id = parse_task_id(id)?;
    // A blank title is a 400 even when the task does not exist.
    let title = request.title.as_deref().map(require_title).transpose()?;

    let mut task = TasksRepository::find_by_id(pool, id)
        .await?
        .ok_or_else(|| TsError::NotFound(TASK_NOT_FOUND.to_string()))?;

    if let Some(title) = title {
        task.title = title;
    }
    if let Some(description) = request.description {
        task.description = Some(description).filter(|d| !d.is_empty());
    }
    if let Some(status) = request.status {
        task.status = status;
    }
    if let Some(priority) = request.priority {
        task.priority = priority;
    }
    task.updated_at = Utc::now();

    if !TasksRepository::update(pool, &task).await? {
        return Err(TsError::NotFound(TASK_NOT_FOUND.to_string()));
    }
    Ok(task)
}

pub async fn delete_task(pool: &SqlitePool, id: &str) -> Result<(), TsError> {
    let id = parse_task_id(id)?;
    if TasksRepository::delete(pool, id).await? {
        Ok(())
    } else {
        Err(TsError::NotFound(TASK_NOT_FOUND.to_string()))
    }
}
