//! services/api/src/web/attendance.rs
//!
//! Manual attendance marking and the attendance history.

use attendance_core::auto_attendance::PREPARATORY_SUBJECT;
use attendance_core::domain::{AttendanceFilter, AttendanceStatus, NewAttendance};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::NaiveDate;
use std::sync::Arc;
use uuid::Uuid;

use crate::web::dto::{
    AttendanceQuery, AttendanceRequest, AttendanceResponse, ErrorBody, Problems,
};
use crate::web::error::HttpError;
use crate::web::state::AppState;

/// The fields of an [`AttendanceRequest`] after validation. `subject_id` is
/// `None` only for preparatory records.
pub struct ValidAttendance {
    pub subject_id: Option<Uuid>,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub class_type: String,
    pub schedule_class_id: Option<Uuid>,
    pub time_duration: Option<String>,
    pub preparatory: bool,
}

/// Validates one attendance payload, reporting problems under `prefix`.
pub fn validate_attendance(
    prefix: &str,
    req: AttendanceRequest,
    problems: &mut Problems,
) -> Option<ValidAttendance> {
    let field = |name: &str| format!("{}{}", prefix, name);

    let class_type = req
        .class_type
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "Lecture".to_string());
    let preparatory = req.preparatory || class_type.eq_ignore_ascii_case(PREPARATORY_SUBJECT);
    if req.subject_id.is_none() && !preparatory {
        problems.push(format!("{} is required", field("subjectId")));
    }

    let date = problems.date(&field("date"), req.date.as_deref(), true);
    let status = match problems.required(&field("status"), req.status.as_deref()) {
        Some(raw) => {
            let parsed = AttendanceStatus::parse(&raw);
            if parsed.is_none() {
                problems.push(format!("{} must be 'present' or 'absent'", field("status")));
            }
            parsed
        }
        None => None,
    };

    Some(ValidAttendance {
        subject_id: req.subject_id,
        date: date?,
        status: status?,
        class_type,
        schedule_class_id: req.schedule_class_id,
        time_duration: req
            .time_duration
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty()),
        preparatory,
    })
}

#[utoipa::path(
    post,
    path = "/attendance",
    tag = "attendance",
    request_body = AttendanceRequest,
    responses(
        (status = 201, description = "Attendance recorded", body = AttendanceResponse),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 404, description = "Unknown subject", body = ErrorBody),
        (status = 409, description = "This class is already marked", body = ErrorBody)
    )
)]
pub async fn mark_attendance_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<AttendanceRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let mut problems = Problems::default();
    let valid = validate_attendance("", req, &mut problems);
    problems.finish()?;
    let Some(valid) = valid else {
        return Err(HttpError::invalid("attendance record is incomplete"));
    };

    let subject = match (valid.preparatory, valid.subject_id) {
        (true, _) => {
            state
                .db
                .find_or_create_subject(user_id, PREPARATORY_SUBJECT)
                .await?
        }
        (false, Some(id)) => state.db.get_subject(user_id, id).await?,
        (false, None) => return Err(HttpError::invalid("subjectId is required")),
    };

    let record = state
        .db
        .record_attendance(NewAttendance {
            user_id,
            subject_id: subject.id,
            date: valid.date,
            status: valid.status,
            class_type: valid.class_type,
            schedule_class_id: valid.schedule_class_id,
            is_auto_marked: false,
            time_duration: valid.time_duration,
        })
        .await?
        .ok_or_else(|| {
            HttpError::Conflict(format!(
                "Attendance for {} on {} is already recorded",
                subject.name, valid.date
            ))
        })?;

    Ok((StatusCode::CREATED, Json(AttendanceResponse::from(record))))
}

#[utoipa::path(
    get,
    path = "/attendance",
    tag = "attendance",
    params(AttendanceQuery),
    responses(
        (status = 200, description = "Matching records", body = [AttendanceResponse]),
        (status = 400, description = "Invalid filter", body = ErrorBody)
    )
)]
pub async fn list_attendance_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Query(query): Query<AttendanceQuery>,
) -> Result<Json<Vec<AttendanceResponse>>, HttpError> {
    let mut problems = Problems::default();
    let from = problems.date("from", query.from.as_deref(), false);
    let to = problems.date("to", query.to.as_deref(), false);
    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            problems.push("from must not be after to");
        }
    }
    problems.finish()?;

    let records = state
        .db
        .list_attendance(
            user_id,
            AttendanceFilter {
                from,
                to,
                subject_id: query.subject_id,
            },
        )
        .await?;
    Ok(Json(records.into_iter().map(Into::into).collect()))
}
