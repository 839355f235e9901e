//! services/api/src/web/todos.rs

use attendance_core::domain::{NewTodo, TodoUpdate};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::web::dto::{ErrorBody, Problems, TodoRequest, TodoResponse, TodoUpdateRequest};
use crate::web::error::HttpError;
use crate::web::state::AppState;

#[utoipa::path(
    post,
    path = "/todos",
    tag = "todos",
    request_body = TodoRequest,
    responses(
        (status = 201, description = "Todo created", body = TodoResponse),
        (status = 400, description = "Invalid request", body = ErrorBody)
    )
)]
pub async fn create_todo_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<TodoRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let mut problems = Problems::default();
    let title = problems.required("title", req.title.as_deref());
    let due_date = problems.date("dueDate", req.due_date.as_deref(), false);
    problems.finish()?;

    let todo = state
        .db
        .create_todo(
            user_id,
            NewTodo {
                title: title.unwrap_or_default(),
                due_date,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(TodoResponse::from(todo))))
}

#[utoipa::path(
    get,
    path = "/todos",
    tag = "todos",
    responses((status = 200, description = "All todos of the user", body = [TodoResponse]))
)]
pub async fn list_todos_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<Vec<TodoResponse>>, HttpError> {
    let todos = state.db.list_todos(user_id).await?;
    Ok(Json(todos.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    put,
    path = "/todos/{id}",
    tag = "todos",
    params(("id" = Uuid, Path, description = "Todo id")),
    request_body = TodoUpdateRequest,
    responses(
        (status = 200, description = "Todo updated", body = TodoResponse),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 404, description = "No such todo", body = ErrorBody)
    )
)]
pub async fn update_todo_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
    Json(req): Json<TodoUpdateRequest>,
) -> Result<Json<TodoResponse>, HttpError> {
    let mut problems = Problems::default();
    let title = match req.title {
        Some(title) => problems.required("title", Some(&title)),
        None => None,
    };
    let due_date = req
        .due_date
        .map(|due| problems.date("dueDate", due.as_deref(), false));
    problems.finish()?;

    let todo = state
        .db
        .update_todo(
            user_id,
            id,
            TodoUpdate {
                title,
                due_date,
                completed: req.completed,
            },
        )
        .await?;
    Ok(Json(todo.into()))
}

#[utoipa::path(
    delete,
    path = "/todos/{id}",
    tag = "todos",
    params(("id" = Uuid, Path, description = "Todo id")),
    responses(
        (status = 204, description = "Todo deleted"),
        (status = 404, description = "No such todo", body = ErrorBody)
    )
)]
pub async fn delete_todo_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HttpError> {
    state.db.delete_todo(user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
