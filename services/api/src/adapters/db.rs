//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.
//!
//! Queries are checked at runtime (`query_as::<_, Record>`), so building the crate
//! does not need a live database.

use std::collections::HashMap;

use async_trait::async_trait;
use attendance_core::calendar::{parse_weekday, weekday_name};
use attendance_core::domain::{
    AcademicPeriod, AttendanceFilter, AttendanceRecord, AttendanceStatus, ClassCounter,
    ClassType, Holiday, NewAcademicPeriod, NewAttendance, NewHoliday, NewNotification,
    NewSchedule, NewSubject, NewTodo, Notification, NotificationPriority, Schedule,
    ScheduledClass, Subject, Todo, TodoUpdate, User, UserCredentials,
};
use attendance_core::ports::{DatabaseService, PortError, PortResult};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    async fn with_stats(&self, records: Vec<SubjectRecord>) -> PortResult<Vec<Subject>> {
        let ids: Vec<Uuid> = records.iter().map(|r| r.id).collect();
        let stats = sqlx::query_as::<_, StatRecord>(
            "SELECT subject_id, class_type, total, attended FROM subject_class_type_stats \
             WHERE subject_id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let mut by_subject: HashMap<Uuid, Vec<(ClassType, ClassCounter)>> = HashMap::new();
        for stat in stats {
            if let Some(kind) = ClassType::from_label(&stat.class_type) {
                by_subject.entry(stat.subject_id).or_default().push((
                    kind,
                    ClassCounter {
                        total: to_u32(stat.total),
                        attended: to_u32(stat.attended),
                    },
                ));
            }
        }

        Ok(records
            .into_iter()
            .map(|record| {
                let mut stats = by_subject.remove(&record.id).unwrap_or_default();
                stats.sort_by_key(|(kind, _)| *kind);
                record.to_domain(stats)
            })
            .collect())
    }

    async fn load_subject(&self, user_id: Uuid, subject_id: Uuid) -> PortResult<Subject> {
        let record = sqlx::query_as::<_, SubjectRecord>(
            "SELECT id, user_id, name, code, total_classes, attended_classes, created_at \
             FROM subjects WHERE id = $1 AND user_id = $2",
        )
        .bind(subject_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?
        .ok_or_else(|| PortError::NotFound(format!("Subject {} not found", subject_id)))?;

        self.with_stats(vec![record])
            .await?
            .pop()
            .ok_or_else(|| PortError::NotFound(format!("Subject {} not found", subject_id)))
    }
}

/// Maps driver errors onto port errors by SQLSTATE.
fn map_sqlx_error(e: sqlx::Error) -> PortError {
    match &e {
        sqlx::Error::RowNotFound => PortError::NotFound("Row not found".to_string()),
        sqlx::Error::Database(db) => match db.code().as_deref() {
            Some("23505") => PortError::Conflict(db.message().to_string()),
            Some("23503") => PortError::NotFound(db.message().to_string()),
            Some("23514") => PortError::Invalid(db.message().to_string()),
            _ => PortError::Unexpected(e.to_string()),
        },
        _ => PortError::Unexpected(e.to_string()),
    }
}

fn to_u32(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    user_id: Uuid,
    email: String,
    auto_attendance_enabled: bool,
    email_notifications: bool,
    schedule_pdf_path: Option<String>,
    created_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            user_id: self.user_id,
            email: self.email,
            auto_attendance_enabled: self.auto_attendance_enabled,
            email_notifications: self.email_notifications,
            schedule_pdf_path: self.schedule_pdf_path,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    user_id: Uuid,
    email: String,
    hashed_password: String,
}

#[derive(FromRow)]
struct SubjectRecord {
    id: Uuid,
    user_id: Uuid,
    name: String,
    code: Option<String>,
    total_classes: i32,
    attended_classes: i32,
    created_at: DateTime<Utc>,
}
impl SubjectRecord {
    fn to_domain(self, class_type_stats: Vec<(ClassType, ClassCounter)>) -> Subject {
        Subject {
            id: self.id,
            user_id: self.user_id,
            name: self.name,
            code: self.code,
            total_classes: to_u32(self.total_classes),
            attended_classes: to_u32(self.attended_classes),
            class_type_stats,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct StatRecord {
    subject_id: Uuid,
    class_type: String,
    total: i32,
    attended: i32,
}

#[derive(FromRow)]
struct PeriodRecord {
    id: Uuid,
    user_id: Uuid,
    semester: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    created_at: DateTime<Utc>,
}
impl PeriodRecord {
    fn to_domain(self) -> AcademicPeriod {
        AcademicPeriod {
            id: self.id,
            user_id: self.user_id,
            semester: self.semester,
            start_date: self.start_date,
            end_date: self.end_date,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct HolidayRecord {
    id: Uuid,
    user_id: Uuid,
    academic_period_id: Option<Uuid>,
    date: NaiveDate,
    reason: String,
}
impl HolidayRecord {
    fn to_domain(self) -> Holiday {
        Holiday {
            id: self.id,
            user_id: self.user_id,
            academic_period_id: self.academic_period_id,
            date: self.date,
            reason: self.reason,
        }
    }
}

#[derive(FromRow)]
struct ScheduleRecord {
    id: Uuid,
    user_id: Uuid,
    academic_period_id: Option<Uuid>,
    off_days: Vec<String>,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct ScheduleClassRecord {
    id: Uuid,
    day: String,
    subject_id: Uuid,
    subject_name: String,
    class_type: String,
    start_time: NaiveTime,
    end_time: NaiveTime,
    room: Option<String>,
}
impl ScheduleClassRecord {
    fn to_domain(self) -> PortResult<ScheduledClass> {
        let day = parse_weekday(&self.day).ok_or_else(|| {
            PortError::Unexpected(format!("Stored class {} has bad day '{}'", self.id, self.day))
        })?;
        Ok(ScheduledClass {
            id: self.id,
            day,
            subject_id: self.subject_id,
            subject_name: self.subject_name,
            class_type: self.class_type,
            start_time: self.start_time,
            end_time: self.end_time,
            room: self.room,
        })
    }
}

#[derive(FromRow)]
struct AttendanceRow {
    id: Uuid,
    user_id: Uuid,
    subject_id: Uuid,
    date: NaiveDate,
    status: String,
    class_type: String,
    schedule_class_id: Option<Uuid>,
    is_auto_marked: bool,
    time_duration: Option<String>,
    created_at: DateTime<Utc>,
}
impl AttendanceRow {
    fn to_domain(self) -> PortResult<AttendanceRecord> {
        let status = AttendanceStatus::parse(&self.status).ok_or_else(|| {
            PortError::Unexpected(format!("Stored record {} has bad status", self.id))
        })?;
        Ok(AttendanceRecord {
            id: self.id,
            user_id: self.user_id,
            subject_id: self.subject_id,
            date: self.date,
            status,
            class_type: self.class_type,
            schedule_class_id: self.schedule_class_id,
            is_auto_marked: self.is_auto_marked,
            time_duration: self.time_duration,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct NotificationRecord {
    id: Uuid,
    user_id: Uuid,
    title: String,
    message: String,
    kind: String,
    category: String,
    priority: String,
    read: bool,
    created_at: DateTime<Utc>,
}
impl NotificationRecord {
    fn to_domain(self) -> Notification {
        Notification {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            message: self.message,
            kind: self.kind,
            category: self.category,
            priority: NotificationPriority::parse(&self.priority)
                .unwrap_or(NotificationPriority::Normal),
            read: self.read,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct TodoRecord {
    id: Uuid,
    user_id: Uuid,
    title: String,
    due_date: Option<NaiveDate>,
    completed: bool,
    created_at: DateTime<Utc>,
}
impl TodoRecord {
    fn to_domain(self) -> Todo {
        Todo {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            due_date: self.due_date,
            completed: self.completed,
            created_at: self.created_at,
        }
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    // --- User Management ---
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (user_id, email, hashed_password) VALUES ($1, $2, $3) \
             RETURNING user_id, email, auto_attendance_enabled, email_notifications, \
             schedule_pdf_path, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match map_sqlx_error(e) {
            PortError::Conflict(_) => {
                PortError::Conflict(format!("Email {} is already registered", email))
            }
            other => other,
        })?;
        Ok(record.to_domain())
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT user_id, email, hashed_password FROM users WHERE LOWER(email) = LOWER($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?
        .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))?;
        Ok(UserCredentials {
            user_id: record.user_id,
            email: record.email,
            hashed_password: record.hashed_password,
        })
    }

    async fn get_user(&self, user_id: Uuid) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT user_id, email, auto_attendance_enabled, email_notifications, \
             schedule_pdf_path, created_at FROM users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?
        .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?;
        Ok(record.to_domain())
    }

    async fn set_auto_attendance(&self, user_id: Uuid, enabled: bool) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "UPDATE users SET auto_attendance_enabled = $2 WHERE user_id = $1 \
             RETURNING user_id, email, auto_attendance_enabled, email_notifications, \
             schedule_pdf_path, created_at",
        )
        .bind(user_id)
        .bind(enabled)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?
        .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?;
        Ok(record.to_domain())
    }

    async fn set_email_notifications(&self, user_id: Uuid, enabled: bool) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "UPDATE users SET email_notifications = $2 WHERE user_id = $1 \
             RETURNING user_id, email, auto_attendance_enabled, email_notifications, \
             schedule_pdf_path, created_at",
        )
        .bind(user_id)
        .bind(enabled)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?
        .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?;
        Ok(record.to_domain())
    }

    async fn set_schedule_pdf_path(&self, user_id: Uuid, path: &str) -> PortResult<()> {
        let result = sqlx::query("UPDATE users SET schedule_pdf_path = $2 WHERE user_id = $1")
            .bind(user_id)
            .bind(path)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("User {} not found", user_id)));
        }
        Ok(())
    }

    async fn list_auto_attendance_users(&self) -> PortResult<Vec<User>> {
        let records = sqlx::query_as::<_, UserRecord>(
            "SELECT user_id, email, auto_attendance_enabled, email_notifications, \
             schedule_pdf_path, created_at FROM users WHERE auto_attendance_enabled",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn list_email_subscribers(&self) -> PortResult<Vec<User>> {
        let records = sqlx::query_as::<_, UserRecord>(
            "SELECT user_id, email, auto_attendance_enabled, email_notifications, \
             schedule_pdf_path, created_at FROM users WHERE email_notifications",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    // --- Auth Methods ---
    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let user_id: Option<Uuid> = sqlx::query_scalar(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > NOW()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        user_id.ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    // --- Subjects ---
    async fn create_subject(&self, user_id: Uuid, subject: NewSubject) -> PortResult<Subject> {
        let record = sqlx::query_as::<_, SubjectRecord>(
            "INSERT INTO subjects (id, user_id, name, code) VALUES ($1, $2, $3, $4) \
             RETURNING id, user_id, name, code, total_classes, attended_classes, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&subject.name)
        .bind(&subject.code)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match map_sqlx_error(e) {
            PortError::Conflict(_) => {
                PortError::Conflict(format!("Subject {} already exists", subject.name))
            }
            other => other,
        })?;
        Ok(record.to_domain(Vec::new()))
    }

    async fn list_subjects(&self, user_id: Uuid) -> PortResult<Vec<Subject>> {
        let records = sqlx::query_as::<_, SubjectRecord>(
            "SELECT id, user_id, name, code, total_classes, attended_classes, created_at \
             FROM subjects WHERE user_id = $1 ORDER BY LOWER(name)",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        self.with_stats(records).await
    }

    async fn get_subject(&self, user_id: Uuid, subject_id: Uuid) -> PortResult<Subject> {
        self.load_subject(user_id, subject_id).await
    }

    async fn find_or_create_subject(&self, user_id: Uuid, name: &str) -> PortResult<Subject> {
        sqlx::query(
            "INSERT INTO subjects (id, user_id, name) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(name)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let record = sqlx::query_as::<_, SubjectRecord>(
            "SELECT id, user_id, name, code, total_classes, attended_classes, created_at \
             FROM subjects WHERE user_id = $1 AND LOWER(name) = LOWER($2)",
        )
        .bind(user_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        self.with_stats(vec![record])
            .await?
            .pop()
            .ok_or_else(|| PortError::Unexpected(format!("Subject {} vanished", name)))
    }

    async fn update_subject(
        &self,
        user_id: Uuid,
        subject_id: Uuid,
        subject: NewSubject,
    ) -> PortResult<Subject> {
        let result = sqlx::query(
            "UPDATE subjects SET name = $3, code = $4 WHERE id = $1 AND user_id = $2",
        )
        .bind(subject_id)
        .bind(user_id)
        .bind(&subject.name)
        .bind(&subject.code)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Subject {} not found", subject_id)));
        }
        self.load_subject(user_id, subject_id).await
    }

    async fn delete_subject(&self, user_id: Uuid, subject_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM subjects WHERE id = $1 AND user_id = $2")
            .bind(subject_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Subject {} not found", subject_id)));
        }
        Ok(())
    }

    // --- Academic Periods and Holidays ---
    async fn create_academic_period(
        &self,
        user_id: Uuid,
        period: NewAcademicPeriod,
    ) -> PortResult<AcademicPeriod> {
        if period.start_date > period.end_date {
            return Err(PortError::Invalid(
                "startDate must not be after endDate".to_string(),
            ));
        }
        let record = sqlx::query_as::<_, PeriodRecord>(
            "INSERT INTO academic_periods (id, user_id, semester, start_date, end_date) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, user_id, semester, start_date, end_date, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&period.semester)
        .bind(period.start_date)
        .bind(period.end_date)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(record.to_domain())
    }

    async fn list_academic_periods(&self, user_id: Uuid) -> PortResult<Vec<AcademicPeriod>> {
        let records = sqlx::query_as::<_, PeriodRecord>(
            "SELECT id, user_id, semester, start_date, end_date, created_at \
             FROM academic_periods WHERE user_id = $1 ORDER BY start_date DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_academic_period(
        &self,
        user_id: Uuid,
        period_id: Uuid,
    ) -> PortResult<AcademicPeriod> {
        let record = sqlx::query_as::<_, PeriodRecord>(
            "SELECT id, user_id, semester, start_date, end_date, created_at \
             FROM academic_periods WHERE id = $1 AND user_id = $2",
        )
        .bind(period_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?
        .ok_or_else(|| PortError::NotFound(format!("Academic period {} not found", period_id)))?;
        Ok(record.to_domain())
    }

    async fn current_academic_period(
        &self,
        user_id: Uuid,
        today: NaiveDate,
    ) -> PortResult<Option<AcademicPeriod>> {
        let record = sqlx::query_as::<_, PeriodRecord>(
            "SELECT id, user_id, semester, start_date, end_date, created_at \
             FROM academic_periods WHERE user_id = $1 \
             ORDER BY (start_date <= $2 AND end_date >= $2) DESC, created_at DESC LIMIT 1",
        )
        .bind(user_id)
        .bind(today)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(record.map(|r| r.to_domain()))
    }

    async fn delete_academic_period(&self, user_id: Uuid, period_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM academic_periods WHERE id = $1 AND user_id = $2")
            .bind(period_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Academic period {} not found", period_id)));
        }
        Ok(())
    }

    async fn create_holiday(&self, user_id: Uuid, holiday: NewHoliday) -> PortResult<Holiday> {
        let record = sqlx::query_as::<_, HolidayRecord>(
            "INSERT INTO holidays (id, user_id, academic_period_id, date, reason) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, user_id, academic_period_id, date, reason",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(holiday.academic_period_id)
        .bind(holiday.date)
        .bind(&holiday.reason)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match map_sqlx_error(e) {
            PortError::Conflict(_) => {
                PortError::Conflict(format!("A holiday already exists on {}", holiday.date))
            }
            other => other,
        })?;
        Ok(record.to_domain())
    }

    async fn list_holidays(
        &self,
        user_id: Uuid,
        academic_period_id: Option<Uuid>,
    ) -> PortResult<Vec<Holiday>> {
        let records = sqlx::query_as::<_, HolidayRecord>(
            "SELECT id, user_id, academic_period_id, date, reason FROM holidays \
             WHERE user_id = $1 AND ($2::uuid IS NULL OR academic_period_id = $2) \
             ORDER BY date",
        )
        .bind(user_id)
        .bind(academic_period_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn delete_holiday(&self, user_id: Uuid, holiday_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM holidays WHERE id = $1 AND user_id = $2")
            .bind(holiday_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Holiday {} not found", holiday_id)));
        }
        Ok(())
    }

    // --- Schedules ---
    async fn create_schedule(&self, schedule: NewSchedule) -> PortResult<Schedule> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let off_days: Vec<String> = schedule
            .off_days
            .iter()
            .map(|d| weekday_name(*d).to_string())
            .collect();
        let record = sqlx::query_as::<_, ScheduleRecord>(
            "INSERT INTO schedules (id, user_id, academic_period_id, off_days) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, user_id, academic_period_id, off_days, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(schedule.user_id)
        .bind(schedule.academic_period_id)
        .bind(&off_days)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let mut classes = Vec::with_capacity(schedule.classes.len());
        for (position, class) in schedule.classes.into_iter().enumerate() {
            let saved = sqlx::query_as::<_, ScheduleClassRecord>(
                "INSERT INTO schedule_classes \
                 (id, schedule_id, position, day, subject_id, subject_name, class_type, \
                  start_time, end_time, room) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
                 RETURNING id, day, subject_id, subject_name, class_type, start_time, \
                 end_time, room",
            )
            .bind(Uuid::new_v4())
            .bind(record.id)
            .bind(position as i32)
            .bind(weekday_name(class.day))
            .bind(class.subject_id)
            .bind(&class.subject_name)
            .bind(&class.class_type)
            .bind(class.start_time)
            .bind(class.end_time)
            .bind(&class.room)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
            classes.push(saved.to_domain()?);
        }

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(Schedule {
            id: record.id,
            user_id: record.user_id,
            academic_period_id: record.academic_period_id,
            classes,
            off_days: schedule.off_days,
            created_at: record.created_at,
        })
    }

    async fn latest_schedule(&self, user_id: Uuid) -> PortResult<Option<Schedule>> {
        let Some(record) = sqlx::query_as::<_, ScheduleRecord>(
            "SELECT id, user_id, academic_period_id, off_days, created_at FROM schedules \
             WHERE user_id = $1 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?
        else {
            return Ok(None);
        };

        let classes = sqlx::query_as::<_, ScheduleClassRecord>(
            "SELECT id, day, subject_id, subject_name, class_type, start_time, end_time, room \
             FROM schedule_classes WHERE schedule_id = $1 ORDER BY position",
        )
        .bind(record.id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?
        .into_iter()
        .map(ScheduleClassRecord::to_domain)
        .collect::<PortResult<Vec<_>>>()?;

        Ok(Some(Schedule {
            id: record.id,
            user_id: record.user_id,
            academic_period_id: record.academic_period_id,
            classes,
            off_days: record
                .off_days
                .iter()
                .filter_map(|d| parse_weekday(d))
                .collect(),
            created_at: record.created_at,
        }))
    }

    // --- Attendance ---
    async fn record_attendance(
        &self,
        record: NewAttendance,
    ) -> PortResult<Option<AttendanceRecord>> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        // The unique slot index turns a concurrent duplicate into "no row returned".
        let inserted = sqlx::query_as::<_, AttendanceRow>(
            "INSERT INTO attendance \
             (id, user_id, subject_id, date, status, class_type, schedule_class_id, \
              is_auto_marked, time_duration) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT DO NOTHING \
             RETURNING id, user_id, subject_id, date, status, class_type, schedule_class_id, \
             is_auto_marked, time_duration, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(record.user_id)
        .bind(record.subject_id)
        .bind(record.date)
        .bind(record.status.as_str())
        .bind(&record.class_type)
        .bind(record.schedule_class_id)
        .bind(record.is_auto_marked)
        .bind(&record.time_duration)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let Some(inserted) = inserted else {
            tx.rollback().await.map_err(map_sqlx_error)?;
            return Ok(None);
        };

        let attended: i32 = if record.status == AttendanceStatus::Present { 1 } else { 0 };
        let updated = sqlx::query(
            "UPDATE subjects SET total_classes = total_classes + 1, \
             attended_classes = attended_classes + $3 WHERE id = $1 AND user_id = $2",
        )
        .bind(record.subject_id)
        .bind(record.user_id)
        .bind(attended)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
        if updated.rows_affected() == 0 {
            return Err(PortError::NotFound(format!(
                "Subject {} not found",
                record.subject_id
            )));
        }

        if let Some(kind) = ClassType::from_label(&record.class_type) {
            sqlx::query(
                "INSERT INTO subject_class_type_stats (subject_id, class_type, total, attended) \
                 VALUES ($1, $2, 1, $3) \
                 ON CONFLICT (subject_id, class_type) DO UPDATE SET \
                 total = subject_class_type_stats.total + 1, \
                 attended = subject_class_type_stats.attended + EXCLUDED.attended",
            )
            .bind(record.subject_id)
            .bind(kind.as_str())
            .bind(attended)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        inserted.to_domain().map(Some)
    }

    async fn list_attendance(
        &self,
        user_id: Uuid,
        filter: AttendanceFilter,
    ) -> PortResult<Vec<AttendanceRecord>> {
        sqlx::query_as::<_, AttendanceRow>(
            "SELECT id, user_id, subject_id, date, status, class_type, schedule_class_id, \
             is_auto_marked, time_duration, created_at FROM attendance \
             WHERE user_id = $1 \
             AND ($2::date IS NULL OR date >= $2) \
             AND ($3::date IS NULL OR date <= $3) \
             AND ($4::uuid IS NULL OR subject_id = $4) \
             ORDER BY date, created_at",
        )
        .bind(user_id)
        .bind(filter.from)
        .bind(filter.to)
        .bind(filter.subject_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?
        .into_iter()
        .map(AttendanceRow::to_domain)
        .collect()
    }

    // --- Notifications ---
    async fn save_notification(&self, notification: NewNotification) -> PortResult<Notification> {
        let record = sqlx::query_as::<_, NotificationRecord>(
            "INSERT INTO notifications (id, user_id, title, message, kind, category, priority) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id, user_id, title, message, kind, category, priority, read, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(notification.user_id)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(&notification.kind)
        .bind(&notification.category)
        .bind(notification.priority.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(record.to_domain())
    }

    async fn list_notifications(
        &self,
        user_id: Uuid,
        unread_only: bool,
    ) -> PortResult<Vec<Notification>> {
        let records = sqlx::query_as::<_, NotificationRecord>(
            "SELECT id, user_id, title, message, kind, category, priority, read, created_at \
             FROM notifications WHERE user_id = $1 AND (NOT $2 OR NOT read) \
             ORDER BY created_at DESC",
        )
        .bind(user_id)
        .bind(unread_only)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn mark_notification_read(
        &self,
        user_id: Uuid,
        notification_id: Uuid,
    ) -> PortResult<()> {
        let result =
            sqlx::query("UPDATE notifications SET read = TRUE WHERE id = $1 AND user_id = $2")
                .bind(notification_id)
                .bind(user_id)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!(
                "Notification {} not found",
                notification_id
            )));
        }
        Ok(())
    }

    async fn mark_all_notifications_read(&self, user_id: Uuid) -> PortResult<u64> {
        let result =
            sqlx::query("UPDATE notifications SET read = TRUE WHERE user_id = $1 AND NOT read")
                .bind(user_id)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }

    // --- Todos ---
    async fn create_todo(&self, user_id: Uuid, todo: NewTodo) -> PortResult<Todo> {
        let record = sqlx::query_as::<_, TodoRecord>(
            "INSERT INTO todos (id, user_id, title, due_date) VALUES ($1, $2, $3, $4) \
             RETURNING id, user_id, title, due_date, completed, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&todo.title)
        .bind(todo.due_date)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(record.to_domain())
    }

    async fn list_todos(&self, user_id: Uuid) -> PortResult<Vec<Todo>> {
        let records = sqlx::query_as::<_, TodoRecord>(
            "SELECT id, user_id, title, due_date, completed, created_at FROM todos \
             WHERE user_id = $1 ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn update_todo(
        &self,
        user_id: Uuid,
        todo_id: Uuid,
        update: TodoUpdate,
    ) -> PortResult<Todo> {
        // $4 says whether the due date is being changed at all, since NULL is a valid new value.
        let record = sqlx::query_as::<_, TodoRecord>(
            "UPDATE todos SET \
             title = COALESCE($3, title), \
             due_date = CASE WHEN $4 THEN $5 ELSE due_date END, \
             completed = COALESCE($6, completed) \
             WHERE id = $1 AND user_id = $2 \
             RETURNING id, user_id, title, due_date, completed, created_at",
        )
        .bind(todo_id)
        .bind(user_id)
        .bind(update.title)
        .bind(update.due_date.is_some())
        .bind(update.due_date.flatten())
        .bind(update.completed)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?
        .ok_or_else(|| PortError::NotFound(format!("Todo {} not found", todo_id)))?;
        Ok(record.to_domain())
    }

    async fn delete_todo(&self, user_id: Uuid, todo_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM todos WHERE id = $1 AND user_id = $2")
            .bind(todo_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Todo {} not found", todo_id)));
        }
        Ok(())
    }
}
