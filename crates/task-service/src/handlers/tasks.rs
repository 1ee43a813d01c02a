//! Task CRUD handlers. All routes sit behind the auth middleware.

use crate::errors::TsError;
use crate::models::{CreateTaskRequest, Task, UpdateTaskRequest};
use crate::routes::AppState;
use crate::services::task_service;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;
use tracing::instrument;

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, TsError> {
    body.map(|Json(value)| value)
        .map_err(|e| TsError::BadRequest(e.body_text()))
}

/// Handler for POST /tasks
#[instrument(skip_all, name = "ts.handlers.tasks.create")]
pub async fn create_task(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Task>), TsError> {
    let task = task_service::create_task(&state.pool, json_body(body)?).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// Handler for GET /tasks
#[instrument(skip_all, name = "ts.handlers.tasks.list")]
pub async fn list_tasks(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Task>>, TsError> {
    Ok(Json(task_service::list_tasks(&state.pool).await?))
}

/// Handler for GET /tasks/:id
#[instrument(skip_all, name = "ts.handlers.tasks.get", fields(task_id = %id))]
pub async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Task>, TsError> {
    Ok(Json(task_service::get_task(&state.pool, &id).await?))
}

/// Handler for PATCH /tasks/:id
#[instrument(skip_all, name = "ts.handlers.tasks.update", fields(task_id = %id))]
pub async fn update_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> Result<Json<Task>, TsError> {
    let request = json_body(body)?;
    Ok(Json(task_service::update_task(&state.pool, &id, request).await?))
}

/// Handler for DELETE /tasks/:id
#[instrument(skip_all, name = "ts.handlers.tasks.delete", fields(task_id = %id))]
pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, TsError> {
    task_service::delete_task(&state.pool, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
