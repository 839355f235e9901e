//! services/api/src/web/rest.rs
//!
//! The health check and the OpenAPI document covering every REST route.

use axum::Json;
use utoipa::OpenApi;

use crate::web::dto::*;
use crate::web::{
    academic, attendance, auth, auto_attendance, chatbot, notifications, schedules, subjects,
    todos, uploads,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        subjects::create_subject_handler,
        subjects::list_subjects_handler,
        subjects::get_subject_handler,
        subjects::update_subject_handler,
        subjects::delete_subject_handler,
        academic::create_period_handler,
        academic::list_periods_handler,
        academic::current_period_handler,
        academic::delete_period_handler,
        academic::create_holiday_handler,
        academic::list_holidays_handler,
        academic::delete_holiday_handler,
        schedules::create_schedule_handler,
        schedules::current_schedule_handler,
        attendance::mark_attendance_handler,
        attendance::list_attendance_handler,
        auto_attendance::toggle_handler,
        auto_attendance::status_handler,
        auto_attendance::mark_past_handler,
        auto_attendance::bulk_upload_handler,
        uploads::upload_schedule_handler,
        notifications::list_notifications_handler,
        notifications::mark_read_handler,
        notifications::mark_all_read_handler,
        notifications::preferences_handler,
        todos::create_todo_handler,
        todos::list_todos_handler,
        todos::update_todo_handler,
        todos::delete_todo_handler,
        chatbot::chatbot_handler,
    ),
    components(
        schemas(
            HealthResponse, ErrorBody,
            auth::SignupRequest, auth::LoginRequest, auth::AuthResponse,
            SubjectRequest, SubjectResponse, ClassTypeStatResponse,
            AcademicPeriodRequest, AcademicPeriodResponse, HolidayRequest, HolidayResponse,
            ScheduledClassRequest, ScheduleRequest, ScheduledClassResponse, ScheduleResponse,
            AttendanceRequest, AttendanceResponse,
            ToggleRequest, ToggleResponse, AutoAttendanceStatusResponse, MarkPastResponse,
            BulkUploadRequest, BulkUploadResponse,
            ScheduleUploadForm, ScheduleItemResponse, ScheduleUploadResponse,
            NotificationResponse, ReadAllResponse, PreferencesRequest, PreferencesResponse,
            TodoRequest, TodoUpdateRequest, TodoResponse,
            ChatRequest, ChatResponse,
        )
    ),
    tags(
        (name = "Attendance Tracker API", description = "Subjects, schedules and attendance for students.")
    )
)]
pub struct ApiDoc;

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "The service is up", body = HealthResponse))
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/auth/signup",
            "/subjects/{id}",
            "/academic-periods/current",
            "/holidays",
            "/schedules",
            "/attendance",
            "/auto-attendance/mark-past",
            "/auto-attendance/bulk-upload",
            "/uploads/schedule",
            "/notifications/read-all",
            "/todos/{id}",
            "/chatbot",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
