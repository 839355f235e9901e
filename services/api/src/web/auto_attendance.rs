//! services/api/src/web/auto_attendance.rs
//!
//! The auto-attendance switch, its status, on-demand backfill and the
//! end-of-day bulk upload.

use attendance_core::auto_attendance::DayRecord;
use axum::{extract::State, Extension, Json};
use chrono::Local;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::web::attendance::validate_attendance;
use crate::web::dto::{
    AutoAttendanceStatusResponse, BulkUploadRequest, BulkUploadResponse, ErrorBody,
    MarkPastResponse, Problems, ToggleRequest, ToggleResponse,
};
use crate::web::error::HttpError;
use crate::web::state::AppState;

/// Switching the feature on backfills immediately.
#[utoipa::path(
    put,
    path = "/auto-attendance/toggle",
    tag = "auto-attendance",
    request_body = ToggleRequest,
    responses((status = 200, description = "New setting, with the backfill it triggered", body = ToggleResponse))
)]
pub async fn toggle_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<ToggleRequest>,
) -> Result<Json<ToggleResponse>, HttpError> {
    let enabled = match req.enabled {
        Some(enabled) => enabled,
        None => !state.db.get_user(user_id).await?.auto_attendance_enabled,
    };
    let user = state.db.set_auto_attendance(user_id, enabled).await?;
    info!(
        "Auto-attendance {} for user {}",
        if user.auto_attendance_enabled { "enabled" } else { "disabled" },
        user_id
    );

    let backfill = if user.auto_attendance_enabled {
        let outcome = state
            .auto_attendance
            .mark_past_classes(user_id, Local::now().naive_local())
            .await?;
        Some(MarkPastResponse::from(outcome))
    } else {
        None
    };

    Ok(Json(ToggleResponse {
        enabled: user.auto_attendance_enabled,
        backfill,
    }))
}

#[utoipa::path(
    get,
    path = "/auto-attendance/status",
    tag = "auto-attendance",
    responses((status = 200, description = "Current setting and schedule summary", body = AutoAttendanceStatusResponse))
)]
pub async fn status_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<AutoAttendanceStatusResponse>, HttpError> {
    let user = state.db.get_user(user_id).await?;
    let schedule = state.db.latest_schedule(user_id).await?;
    let current_period = state
        .db
        .current_academic_period(user_id, Local::now().date_naive())
        .await?;

    Ok(Json(AutoAttendanceStatusResponse {
        enabled: user.auto_attendance_enabled,
        has_schedule: schedule.is_some(),
        class_count: schedule.as_ref().map_or(0, |s| s.classes.len()),
        schedule_created_at: schedule.map(|s| s.created_at),
        current_period: current_period.map(Into::into),
    }))
}

/// Runs the backfill now, whether or not the feature is switched on.
#[utoipa::path(
    post,
    path = "/auto-attendance/mark-past",
    tag = "auto-attendance",
    responses((status = 200, description = "Records created by the backfill", body = MarkPastResponse))
)]
pub async fn mark_past_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<MarkPastResponse>, HttpError> {
    let outcome = state
        .auto_attendance
        .mark_past_classes(user_id, Local::now().naive_local())
        .await?;
    Ok(Json(outcome.into()))
}

#[utoipa::path(
    post,
    path = "/auto-attendance/bulk-upload",
    tag = "auto-attendance",
    request_body = BulkUploadRequest,
    responses(
        (status = 200, description = "Records that were newly saved", body = BulkUploadResponse),
        (status = 400, description = "Invalid records", body = ErrorBody)
    )
)]
pub async fn bulk_upload_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<BulkUploadRequest>,
) -> Result<Json<BulkUploadResponse>, HttpError> {
    let mut problems = Problems::default();
    if req.records.is_empty() {
        problems.push("records must contain at least one record");
    }
    let records: Vec<DayRecord> = req
        .records
        .into_iter()
        .enumerate()
        .filter_map(|(i, r)| validate_attendance(&format!("records[{}].", i), r, &mut problems))
        .map(|v| DayRecord {
            // Preparatory records are re-routed, so their subject id is ignored.
            subject_id: v.subject_id.unwrap_or_default(),
            date: v.date,
            status: v.status,
            class_type: v.class_type,
            schedule_class_id: v.schedule_class_id,
            time_duration: v.time_duration,
            preparatory: v.preparatory,
        })
        .collect();
    problems.finish()?;

    let saved = state
        .auto_attendance
        .upload_day_records(user_id, records)
        .await?;
    Ok(Json(BulkUploadResponse {
        saved: saved.len(),
        records: saved.into_iter().map(Into::into).collect(),
    }))
}
