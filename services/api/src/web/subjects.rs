//! services/api/src/web/subjects.rs
//!
//! Subject CRUD.

use attendance_core::domain::NewSubject;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::web::dto::{ErrorBody, Problems, SubjectRequest, SubjectResponse};
use crate::web::error::HttpError;
use crate::web::state::AppState;

fn validate(req: SubjectRequest) -> Result<NewSubject, HttpError> {
    let mut problems = Problems::default();
    let name = problems.required("name", req.name.as_deref());
    problems.finish()?;
    Ok(NewSubject {
        name: name.unwrap_or_default(),
        code: req
            .code
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty()),
    })
}

#[utoipa::path(
    post,
    path = "/subjects",
    tag = "subjects",
    request_body = SubjectRequest,
    responses(
        (status = 201, description = "Subject created", body = SubjectResponse),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 409, description = "A subject with that name exists", body = ErrorBody)
    )
)]
pub async fn create_subject_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<SubjectRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let subject = state.db.create_subject(user_id, validate(req)?).await?;
    Ok((StatusCode::CREATED, Json(SubjectResponse::from(subject))))
}

#[utoipa::path(
    get,
    path = "/subjects",
    tag = "subjects",
    responses((status = 200, description = "All subjects of the user", body = [SubjectResponse]))
)]
pub async fn list_subjects_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<Vec<SubjectResponse>>, HttpError> {
    let subjects = state.db.list_subjects(user_id).await?;
    Ok(Json(subjects.into_iter().map(SubjectResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/subjects/{id}",
    tag = "subjects",
    params(("id" = Uuid, Path, description = "Subject id")),
    responses(
        (status = 200, description = "The subject", body = SubjectResponse),
        (status = 404, description = "No such subject", body = ErrorBody)
    )
)]
pub async fn get_subject_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
) -> Result<Json<SubjectResponse>, HttpError> {
    Ok(Json(state.db.get_subject(user_id, id).await?.into()))
}

#[utoipa::path(
    put,
    path = "/subjects/{id}",
    tag = "subjects",
    params(("id" = Uuid, Path, description = "Subject id")),
    request_body = SubjectRequest,
    responses(
        (status = 200, description = "Subject updated", body = SubjectResponse),
        (status = 404, description = "No such subject", body = ErrorBody)
    )
)]
pub async fn update_subject_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
    Json(req): Json<SubjectRequest>,
) -> Result<Json<SubjectResponse>, HttpError> {
    let subject = state.db.update_subject(user_id, id, validate(req)?).await?;
    Ok(Json(subject.into()))
}

#[utoipa::path(
    delete,
    path = "/subjects/{id}",
    tag = "subjects",
    params(("id" = Uuid, Path, description = "Subject id")),
    responses(
        (status = 204, description = "Subject and its attendance deleted"),
        (status = 404, description = "No such subject", body = ErrorBody)
    )
)]
pub async fn delete_subject_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HttpError> {
    state.db.delete_subject(user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
