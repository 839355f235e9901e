//! services/api/src/web/uploads.rs
//!
//! Timetable PDF upload. The file is stored under the user's upload directory
//! and parsed on a blocking thread.

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::adapters::pdf::{is_pdf_magic, parse_schedule_pdf};
use crate::web::dto::{
    ErrorBody, ScheduleItemResponse, ScheduleUploadForm, ScheduleUploadResponse,
};
use crate::web::error::HttpError;
use crate::web::state::AppState;

const FILE_FIELD: &str = "file";
const PDF_MIME: &str = "application/pdf";

fn multipart_error(e: MultipartError, limit: usize) -> HttpError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        HttpError::PayloadTooLarge(format!("The file exceeds the {} byte limit", limit))
    } else {
        HttpError::invalid(format!("Malformed upload: {}", e.body_text()))
    }
}

#[utoipa::path(
    post,
    path = "/uploads/schedule",
    tag = "uploads",
    request_body(content = ScheduleUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Classes found in the timetable", body = ScheduleUploadResponse),
        (status = 400, description = "No file part", body = ErrorBody),
        (status = 413, description = "File too large", body = ErrorBody),
        (status = 415, description = "Not a PDF", body = ErrorBody),
        (status = 422, description = "No schedule could be read from the PDF", body = ErrorBody)
    )
)]
pub async fn upload_schedule_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<ScheduleUploadResponse>, HttpError> {
    let limit = state.config.max_upload_bytes;

    // 1. Find the file part and read it
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let declared_pdf = field
            .content_type()
            .is_some_and(|ct| ct.eq_ignore_ascii_case(PDF_MIME));
        let bytes = field.bytes().await.map_err(|e| multipart_error(e, limit))?;
        upload = Some((declared_pdf, bytes));
        break;
    }
    let Some((declared_pdf, bytes)) = upload else {
        return Err(HttpError::invalid("A multipart 'file' part is required"));
    };

    // 2. Check size and type
    if bytes.len() > limit {
        return Err(HttpError::PayloadTooLarge(format!(
            "The file exceeds the {} byte limit",
            limit
        )));
    }
    if !declared_pdf && !is_pdf_magic(&bytes) {
        return Err(HttpError::UnsupportedMediaType(
            "Only PDF timetables are accepted".to_string(),
        ));
    }

    // 3. Store it and remember the path on the user
    let dir = state.config.uploads_dir.join(user_id.to_string());
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| HttpError::Internal(format!("Failed to create {}: {}", dir.display(), e)))?;
    let path = dir.join(format!("{}.pdf", Uuid::new_v4()));
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|e| HttpError::Internal(format!("Failed to write {}: {}", path.display(), e)))?;
    state
        .db
        .set_schedule_pdf_path(user_id, &path.to_string_lossy())
        .await?;
    info!("Stored {} byte timetable at {}", bytes.len(), path.display());

    // 4. Parse off the async runtime
    let extractor = state.extractor.clone();
    let extraction = tokio::task::spawn_blocking(move || parse_schedule_pdf(&path, &extractor))
        .await
        .map_err(|e| HttpError::Internal(format!("PDF parsing task failed: {}", e)))?
        .inspect_err(|e| warn!("Timetable for user {} was not parsed: {}", user_id, e))?;

    Ok(Json(ScheduleUploadResponse {
        strategy: extraction.strategy.to_string(),
        items: extraction
            .items
            .into_iter()
            .map(ScheduleItemResponse::from)
            .collect(),
    }))
}
