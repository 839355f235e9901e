//! services/api/src/web/academic.rs
//!
//! Academic periods and holidays.

use attendance_core::domain::{NewAcademicPeriod, NewHoliday};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::Local;
use std::sync::Arc;
use uuid::Uuid;

use crate::web::dto::{
    AcademicPeriodRequest, AcademicPeriodResponse, ErrorBody, HolidayQuery, HolidayRequest,
    HolidayResponse, Problems,
};
use crate::web::error::HttpError;
use crate::web::state::AppState;

//=========================================================================================
// Academic Periods
//=========================================================================================

#[utoipa::path(
    post,
    path = "/academic-periods",
    tag = "academic",
    request_body = AcademicPeriodRequest,
    responses(
        (status = 201, description = "Period created", body = AcademicPeriodResponse),
        (status = 400, description = "Invalid request", body = ErrorBody)
    )
)]
pub async fn create_period_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<AcademicPeriodRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let mut problems = Problems::default();
    let semester = problems.required("semester", req.semester.as_deref());
    let start_date = problems.date("startDate", req.start_date.as_deref(), true);
    let end_date = problems.date("endDate", req.end_date.as_deref(), true);
    if let (Some(start), Some(end)) = (start_date, end_date) {
        if start > end {
            problems.push("startDate must not be after endDate");
        }
    }
    problems.finish()?;
    let (Some(semester), Some(start_date), Some(end_date)) = (semester, start_date, end_date)
    else {
        return Err(HttpError::invalid("semester, startDate and endDate are required"));
    };

    let period = state
        .db
        .create_academic_period(
            user_id,
            NewAcademicPeriod {
                semester,
                start_date,
                end_date,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(AcademicPeriodResponse::from(period))))
}

#[utoipa::path(
    get,
    path = "/academic-periods",
    tag = "academic",
    responses((status = 200, description = "Periods, newest first", body = [AcademicPeriodResponse]))
)]
pub async fn list_periods_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<Vec<AcademicPeriodResponse>>, HttpError> {
    let periods = state.db.list_academic_periods(user_id).await?;
    Ok(Json(periods.into_iter().map(Into::into).collect()))
}

/// The period containing today, else the most recently created one.
#[utoipa::path(
    get,
    path = "/academic-periods/current",
    tag = "academic",
    responses(
        (status = 200, description = "The current period", body = AcademicPeriodResponse),
        (status = 404, description = "No period defined", body = ErrorBody)
    )
)]
pub async fn current_period_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<AcademicPeriodResponse>, HttpError> {
    let today = Local::now().date_naive();
    state
        .db
        .current_academic_period(user_id, today)
        .await?
        .map(|p| Json(p.into()))
        .ok_or_else(|| HttpError::NotFound("No academic period defined".to_string()))
}

#[utoipa::path(
    delete,
    path = "/academic-periods/{id}",
    tag = "academic",
    params(("id" = Uuid, Path, description = "Academic period id")),
    responses(
        (status = 204, description = "Period deleted with its holidays"),
        (status = 404, description = "No such period", body = ErrorBody)
    )
)]
pub async fn delete_period_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HttpError> {
    state.db.delete_academic_period(user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// Holidays
//=========================================================================================

#[utoipa::path(
    post,
    path = "/holidays",
    tag = "academic",
    request_body = HolidayRequest,
    responses(
        (status = 201, description = "Holiday created", body = HolidayResponse),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 404, description = "Unknown academic period", body = ErrorBody),
        (status = 409, description = "The period already has a holiday on that date", body = ErrorBody)
    )
)]
pub async fn create_holiday_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<HolidayRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let mut problems = Problems::default();
    let date = problems.date("date", req.date.as_deref(), true);
    problems.finish()?;
    let Some(date) = date else {
        return Err(HttpError::invalid("date is required"));
    };

    if let Some(period_id) = req.academic_period_id {
        let period = state.db.get_academic_period(user_id, period_id).await?;
        if !period.contains(date) {
            return Err(HttpError::invalid(format!(
                "date {} is outside the academic period ({} to {})",
                date, period.start_date, period.end_date
            )));
        }
    }

    let holiday = state
        .db
        .create_holiday(
            user_id,
            NewHoliday {
                academic_period_id: req.academic_period_id,
                date,
                reason: req.reason.unwrap_or_default().trim().to_string(),
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(HolidayResponse::from(holiday))))
}

#[utoipa::path(
    get,
    path = "/holidays",
    tag = "academic",
    params(HolidayQuery),
    responses((status = 200, description = "Holidays by date", body = [HolidayResponse]))
)]
pub async fn list_holidays_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Query(query): Query<HolidayQuery>,
) -> Result<Json<Vec<HolidayResponse>>, HttpError> {
    let holidays = state
        .db
        .list_holidays(user_id, query.academic_period_id)
        .await?;
    Ok(Json(holidays.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    delete,
    path = "/holidays/{id}",
    tag = "academic",
    params(("id" = Uuid, Path, description = "Holiday id")),
    responses(
        (status = 204, description = "Holiday deleted"),
        (status = 404, description = "No such holiday", body = ErrorBody)
    )
)]
pub async fn delete_holiday_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HttpError> {
    state.db.delete_holiday(user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
