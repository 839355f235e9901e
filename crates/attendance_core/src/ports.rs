//! crates/attendance_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::domain::{
    AcademicPeriod, AttendanceFilter, AttendanceRecord, Holiday, NewAcademicPeriod,
    NewAttendance, NewHoliday, NewNotification, NewSchedule, NewSubject, NewTodo, Notification,
    Schedule, Subject, Todo, TodoUpdate, User, UserCredentials,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invalid input: {0}")]
    Invalid(String),
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Every row is scoped by `user_id`; lookups for another user's rows report `NotFound`.
#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- User Management ---
    async fn create_user_with_email(&self, email: &str, hashed_password: &str)
        -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn get_user(&self, user_id: Uuid) -> PortResult<User>;

    async fn set_auto_attendance(&self, user_id: Uuid, enabled: bool) -> PortResult<User>;

    async fn set_email_notifications(&self, user_id: Uuid, enabled: bool) -> PortResult<User>;

    async fn set_schedule_pdf_path(&self, user_id: Uuid, path: &str) -> PortResult<()>;

    async fn list_auto_attendance_users(&self) -> PortResult<Vec<User>>;

    async fn list_email_subscribers(&self) -> PortResult<Vec<User>>;

    // --- Auth Methods ---
    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Subjects ---
    async fn create_subject(&self, user_id: Uuid, subject: NewSubject) -> PortResult<Subject>;

    async fn list_subjects(&self, user_id: Uuid) -> PortResult<Vec<Subject>>;

    async fn get_subject(&self, user_id: Uuid, subject_id: Uuid) -> PortResult<Subject>;

    /// Case-insensitive lookup by name, creating the subject when absent.
    async fn find_or_create_subject(&self, user_id: Uuid, name: &str) -> PortResult<Subject>;

    async fn update_subject(
        &self,
        user_id: Uuid,
        subject_id: Uuid,
        subject: NewSubject,
    ) -> PortResult<Subject>;

    async fn delete_subject(&self, user_id: Uuid, subject_id: Uuid) -> PortResult<()>;

    // --- Academic Periods and Holidays ---
    async fn create_academic_period(
        &self,
        user_id: Uuid,
        period: NewAcademicPeriod,
    ) -> PortResult<AcademicPeriod>;

    async fn list_academic_periods(&self, user_id: Uuid) -> PortResult<Vec<AcademicPeriod>>;

    async fn get_academic_period(&self, user_id: Uuid, period_id: Uuid)
        -> PortResult<AcademicPeriod>;

    /// The period containing `today`, else the most recently created one.
    async fn current_academic_period(
        &self,
        user_id: Uuid,
        today: NaiveDate,
    ) -> PortResult<Option<AcademicPeriod>>;

    async fn delete_academic_period(&self, user_id: Uuid, period_id: Uuid) -> PortResult<()>;

    /// Fails with `Conflict` when the period already has a holiday on that date.
    async fn create_holiday(&self, user_id: Uuid, holiday: NewHoliday) -> PortResult<Holiday>;

    async fn list_holidays(
        &self,
        user_id: Uuid,
        academic_period_id: Option<Uuid>,
    ) -> PortResult<Vec<Holiday>>;

    async fn delete_holiday(&self, user_id: Uuid, holiday_id: Uuid) -> PortResult<()>;

    // --- Schedules ---
    async fn create_schedule(&self, schedule: NewSchedule) -> PortResult<Schedule>;

    async fn latest_schedule(&self, user_id: Uuid) -> PortResult<Option<Schedule>>;

    // --- Attendance ---
    /// Inserts the record and bumps the subject counters in one step.
    /// Returns `None` when a record with the same unique key already exists.
    async fn record_attendance(&self, record: NewAttendance)
        -> PortResult<Option<AttendanceRecord>>;

    async fn list_attendance(
        &self,
        user_id: Uuid,
        filter: AttendanceFilter,
    ) -> PortResult<Vec<AttendanceRecord>>;

    // --- Notifications ---
    async fn save_notification(&self, notification: NewNotification) -> PortResult<Notification>;

    async fn list_notifications(
        &self,
        user_id: Uuid,
        unread_only: bool,
    ) -> PortResult<Vec<Notification>>;

    async fn mark_notification_read(&self, user_id: Uuid, notification_id: Uuid)
        -> PortResult<()>;

    async fn mark_all_notifications_read(&self, user_id: Uuid) -> PortResult<u64>;

    // --- Todos ---
    async fn create_todo(&self, user_id: Uuid, todo: NewTodo) -> PortResult<Todo>;

    async fn list_todos(&self, user_id: Uuid) -> PortResult<Vec<Todo>>;

    async fn update_todo(&self, user_id: Uuid, todo_id: Uuid, update: TodoUpdate)
        -> PortResult<Todo>;

    async fn delete_todo(&self, user_id: Uuid, todo_id: Uuid) -> PortResult<()>;
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Sends a plain-text email to a single recipient.
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> PortResult<()>;
}

#[async_trait]
pub trait ChatAssistantService: Send + Sync {
    /// Answers a user's message given a summary of their attendance.
    async fn reply(&self, message: &str, attendance_context: &str) -> PortResult<String>;
}
