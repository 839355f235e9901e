//! services/api/src/web/schedules.rs
//!
//! Saving a confirmed weekly timetable and reading back the current one.

use attendance_core::calendar::{format_time_range, parse_clock, parse_time_range, parse_weekday};
use attendance_core::domain::{NewNotification, NewSchedule, NewScheduledClass, NotificationPriority};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use chrono::{Local, NaiveTime, Weekday};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::web::dto::{ErrorBody, Problems, ScheduleRequest, ScheduleResponse, ScheduledClassRequest};
use crate::web::error::HttpError;
use crate::web::state::AppState;

const DEFAULT_CLASS_TYPE: &str = "Lecture";

/// A class whose day and times passed validation; the subject is resolved later.
struct ValidClass {
    day: Weekday,
    start_time: NaiveTime,
    end_time: NaiveTime,
    subject_id: Option<Uuid>,
    subject_name: Option<String>,
    class_type: String,
    room: Option<String>,
}

fn validate_class(
    index: usize,
    req: ScheduledClassRequest,
    problems: &mut Problems,
) -> Option<ValidClass> {
    let field = |name: &str| format!("classes[{}].{}", index, name);

    let day = match req.day.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        Some(day) => {
            let parsed = parse_weekday(day);
            if parsed.is_none() {
                problems.push(format!("{} '{}' is not a weekday", field("day"), day));
            }
            parsed
        }
        None => {
            problems.push(format!("{} is required", field("day")));
            None
        }
    };

    let times = match (req.start_time.as_deref(), req.end_time.as_deref(), req.time.as_deref()) {
        (Some(start), Some(end), _) => parse_clock(start).zip(parse_clock(end)),
        (_, _, Some(range)) => parse_time_range(range),
        _ => {
            problems.push(format!(
                "{} and {} (or {}) are required",
                field("startTime"),
                field("endTime"),
                field("time")
            ));
            return None;
        }
    };
    let times = match times {
        Some((start, end)) if start < end => Some((start, end)),
        Some(_) => {
            problems.push(format!("{} must be before its end time", field("startTime")));
            None
        }
        None => {
            problems.push(format!("{} has an unreadable time", field("time")));
            None
        }
    };

    let subject_name = req
        .subject_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    if req.subject_id.is_none() && subject_name.is_none() {
        problems.push(format!(
            "{} or {} is required",
            field("subjectId"),
            field("subjectName")
        ));
        return None;
    }

    let (day, (start_time, end_time)) = (day?, times?);
    Some(ValidClass {
        day,
        start_time,
        end_time,
        subject_id: req.subject_id,
        subject_name,
        class_type: req
            .class_type
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_CLASS_TYPE.to_string()),
        room: req.room.map(|r| r.trim().to_string()).filter(|r| !r.is_empty()),
    })
}

#[utoipa::path(
    post,
    path = "/schedules",
    tag = "schedules",
    request_body = ScheduleRequest,
    responses(
        (status = 201, description = "Schedule saved", body = ScheduleResponse),
        (status = 400, description = "Invalid classes or off-days", body = ErrorBody),
        (status = 404, description = "Unknown subject or academic period", body = ErrorBody)
    )
)]
pub async fn create_schedule_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<ScheduleRequest>,
) -> Result<impl IntoResponse, HttpError> {
    // 1. Validate days, times and off-days
    let mut problems = Problems::default();
    if req.classes.is_empty() {
        problems.push("classes must contain at least one class");
    }
    let mut off_days = Vec::new();
    for day in &req.off_days {
        match parse_weekday(day) {
            Some(d) if !off_days.contains(&d) => off_days.push(d),
            Some(_) => {}
            None => problems.push(format!("offDays entry '{}' is not a weekday", day)),
        }
    }
    let valid: Vec<ValidClass> = req
        .classes
        .into_iter()
        .enumerate()
        .filter_map(|(i, c)| validate_class(i, c, &mut problems))
        .collect();
    problems.finish()?;

    // 2. Resolve the academic period, defaulting to the current one
    let academic_period_id = match req.academic_period_id {
        Some(id) => Some(state.db.get_academic_period(user_id, id).await?.id),
        None => state
            .db
            .current_academic_period(user_id, Local::now().date_naive())
            .await?
            .map(|p| p.id),
    };

    // 3. Resolve subjects by id, or by name creating them as needed
    let mut classes = Vec::with_capacity(valid.len());
    for class in valid {
        let subject = match (class.subject_id, class.subject_name.as_deref()) {
            (Some(id), _) => state.db.get_subject(user_id, id).await?,
            (None, Some(name)) => state.db.find_or_create_subject(user_id, name).await?,
            (None, None) => continue,
        };
        classes.push(NewScheduledClass {
            day: class.day,
            subject_id: subject.id,
            subject_name: subject.name,
            class_type: class.class_type,
            start_time: class.start_time,
            end_time: class.end_time,
            room: class.room,
        });
    }

    let schedule = state
        .db
        .create_schedule(NewSchedule {
            user_id,
            academic_period_id,
            classes,
            off_days,
        })
        .await?;
    info!(
        "Saved schedule {} with {} classes for user {}",
        schedule.id,
        schedule.classes.len(),
        user_id
    );

    let summary = schedule
        .classes
        .first()
        .map(|c| {
            format!(
                ", starting with {} {}",
                c.subject_name,
                format_time_range(c.start_time, c.end_time)
            )
        })
        .unwrap_or_default();
    if let Err(e) = state
        .notifier
        .notify(NewNotification {
            user_id,
            title: "Schedule saved".to_string(),
            message: format!(
                "Your weekly schedule has {} classes{}.",
                schedule.classes.len(),
                summary
            ),
            kind: "schedule".to_string(),
            category: "schedule".to_string(),
            priority: NotificationPriority::Low,
        })
        .await
    {
        warn!("Failed to notify user {} about their schedule: {}", user_id, e);
    }

    Ok((StatusCode::CREATED, Json(ScheduleResponse::from(schedule))))
}

#[utoipa::path(
    get,
    path = "/schedules",
    tag = "schedules",
    responses(
        (status = 200, description = "The most recent schedule", body = ScheduleResponse),
        (status = 404, description = "No schedule saved yet", body = ErrorBody)
    )
)]
pub async fn current_schedule_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<ScheduleResponse>, HttpError> {
    state
        .db
        .latest_schedule(user_id)
        .await?
        .map(|s| Json(s.into()))
        .ok_or_else(|| HttpError::NotFound("No schedule saved yet".to_string()))
}
