//! crates/attendance_core/src/memory.rs
//!
//! A `DatabaseService` kept entirely in memory. It applies the same
//! uniqueness and scoping rules as the PostgreSQL adapter and backs the test
//! suites of both crates.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::{
    AcademicPeriod, AttendanceFilter, AttendanceRecord, ClassCounter, ClassType, Holiday,
    NewAcademicPeriod, NewAttendance, NewHoliday, NewNotification, NewSchedule, NewSubject,
    NewTodo, Notification, Schedule, ScheduledClass, Subject, Todo, TodoUpdate, User,
    UserCredentials,
};
use crate::ports::{DatabaseService, PortError, PortResult};

#[derive(Default)]
struct Tables {
    users: Vec<(User, String)>,
    auth_sessions: HashMap<String, (Uuid, DateTime<Utc>)>,
    subjects: Vec<Subject>,
    periods: Vec<AcademicPeriod>,
    holidays: Vec<Holiday>,
    schedules: Vec<Schedule>,
    attendance: Vec<AttendanceRecord>,
    notifications: Vec<Notification>,
    todos: Vec<Todo>,
}

impl Tables {
    fn user_mut(&mut self, user_id: Uuid) -> PortResult<&mut User> {
        self.users
            .iter_mut()
            .map(|(user, _)| user)
            .find(|user| user.user_id == user_id)
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    fn subject_mut(&mut self, user_id: Uuid, subject_id: Uuid) -> PortResult<&mut Subject> {
        self.subjects
            .iter_mut()
            .find(|s| s.id == subject_id && s.user_id == user_id)
            .ok_or_else(|| PortError::NotFound(format!("Subject {} not found", subject_id)))
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides a schedule's creation time, which is where the backfill
    /// starts when no academic period is linked.
    pub async fn set_schedule_created_at(&self, schedule_id: Uuid, created_at: DateTime<Utc>) {
        let mut tables = self.tables.lock().await;
        if let Some(schedule) = tables.schedules.iter_mut().find(|s| s.id == schedule_id) {
            schedule.created_at = created_at;
        }
    }
}

#[async_trait]
impl DatabaseService for InMemoryStore {
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User> {
        let mut tables = self.tables.lock().await;
        if tables
            .users
            .iter()
            .any(|(user, _)| user.email.eq_ignore_ascii_case(email))
        {
            return Err(PortError::Conflict(format!("Email {} is already registered", email)));
        }
        let user = User {
            user_id: Uuid::new_v4(),
            email: email.to_string(),
            auto_attendance_enabled: false,
            email_notifications: true,
            schedule_pdf_path: None,
            created_at: Utc::now(),
        };
        tables.users.push((user.clone(), hashed_password.to_string()));
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let tables = self.tables.lock().await;
        tables
            .users
            .iter()
            .find(|(user, _)| user.email.eq_ignore_ascii_case(email))
            .map(|(user, hash)| UserCredentials {
                user_id: user.user_id,
                email: user.email.clone(),
                hashed_password: hash.clone(),
            })
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))
    }

    async fn get_user(&self, user_id: Uuid) -> PortResult<User> {
        let mut tables = self.tables.lock().await;
        tables.user_mut(user_id).map(|u| u.clone())
    }

    async fn set_auto_attendance(&self, user_id: Uuid, enabled: bool) -> PortResult<User> {
        let mut tables = self.tables.lock().await;
        let user = tables.user_mut(user_id)?;
        user.auto_attendance_enabled = enabled;
        Ok(user.clone())
    }

    async fn set_email_notifications(&self, user_id: Uuid, enabled: bool) -> PortResult<User> {
        let mut tables = self.tables.lock().await;
        let user = tables.user_mut(user_id)?;
        user.email_notifications = enabled;
        Ok(user.clone())
    }

    async fn set_schedule_pdf_path(&self, user_id: Uuid, path: &str) -> PortResult<()> {
        let mut tables = self.tables.lock().await;
        tables.user_mut(user_id)?.schedule_pdf_path = Some(path.to_string());
        Ok(())
    }

    async fn list_auto_attendance_users(&self) -> PortResult<Vec<User>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .iter()
            .map(|(user, _)| user)
            .filter(|user| user.auto_attendance_enabled)
            .cloned()
            .collect())
    }

    async fn list_email_subscribers(&self) -> PortResult<Vec<User>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .iter()
            .map(|(user, _)| user)
            .filter(|user| user.email_notifications)
            .cloned()
            .collect())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        let mut tables = self.tables.lock().await;
        tables
            .auth_sessions
            .insert(session_id.to_string(), (user_id, expires_at));
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let tables = self.tables.lock().await;
        match tables.auth_sessions.get(session_id) {
            Some((user_id, expires_at)) if *expires_at > Utc::now() => Ok(*user_id),
            _ => Err(PortError::Unauthorized),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        let mut tables = self.tables.lock().await;
        tables.auth_sessions.remove(session_id);
        Ok(())
    }

    async fn create_subject(&self, user_id: Uuid, subject: NewSubject) -> PortResult<Subject> {
        let mut tables = self.tables.lock().await;
        if tables
            .subjects
            .iter()
            .any(|s| s.user_id == user_id && s.name.eq_ignore_ascii_case(&subject.name))
        {
            return Err(PortError::Conflict(format!("Subject {} already exists", subject.name)));
        }
        let created = Subject {
            id: Uuid::new_v4(),
            user_id,
            name: subject.name,
            code: subject.code,
            total_classes: 0,
            attended_classes: 0,
            class_type_stats: Vec::new(),
            created_at: Utc::now(),
        };
        tables.subjects.push(created.clone());
        Ok(created)
    }

    async fn list_subjects(&self, user_id: Uuid) -> PortResult<Vec<Subject>> {
        let tables = self.tables.lock().await;
        let mut subjects: Vec<Subject> = tables
            .subjects
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        subjects.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(subjects)
    }

    async fn get_subject(&self, user_id: Uuid, subject_id: Uuid) -> PortResult<Subject> {
        let mut tables = self.tables.lock().await;
        tables.subject_mut(user_id, subject_id).map(|s| s.clone())
    }

    async fn find_or_create_subject(&self, user_id: Uuid, name: &str) -> PortResult<Subject> {
        {
            let tables = self.tables.lock().await;
            if let Some(existing) = tables
                .subjects
                .iter()
                .find(|s| s.user_id == user_id && s.name.eq_ignore_ascii_case(name))
            {
                return Ok(existing.clone());
            }
        }
        self.create_subject(
            user_id,
            NewSubject {
                name: name.to_string(),
                code: None,
            },
        )
        .await
    }

    async fn update_subject(
        &self,
        user_id: Uuid,
        subject_id: Uuid,
        subject: NewSubject,
    ) -> PortResult<Subject> {
        let mut tables = self.tables.lock().await;
        let existing = tables.subject_mut(user_id, subject_id)?;
        existing.name = subject.name;
        existing.code = subject.code;
        Ok(existing.clone())
    }

    async fn delete_subject(&self, user_id: Uuid, subject_id: Uuid) -> PortResult<()> {
        let mut tables = self.tables.lock().await;
        tables.subject_mut(user_id, subject_id)?;
        tables.subjects.retain(|s| s.id != subject_id);
        tables.attendance.retain(|r| r.subject_id != subject_id);
        Ok(())
    }

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
        let mut tables = self.tables.lock().await;
        let created = AcademicPeriod {
            id: Uuid::new_v4(),
            user_id,
            semester: period.semester,
            start_date: period.start_date,
            end_date: period.end_date,
            created_at: Utc::now(),
        };
        tables.periods.push(created.clone());
        Ok(created)
    }

    async fn list_academic_periods(&self, user_id: Uuid) -> PortResult<Vec<AcademicPeriod>> {
        let tables = self.tables.lock().await;
        let mut periods: Vec<_> = tables
            .periods
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        periods.sort_by_key(|p| std::cmp::Reverse(p.start_date));
        Ok(periods)
    }

    async fn get_academic_period(
        &self,
        user_id: Uuid,
        period_id: Uuid,
    ) -> PortResult<AcademicPeriod> {
        let tables = self.tables.lock().await;
        tables
            .periods
            .iter()
            .find(|p| p.id == period_id && p.user_id == user_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Academic period {} not found", period_id)))
    }

    async fn current_academic_period(
        &self,
        user_id: Uuid,
        today: NaiveDate,
    ) -> PortResult<Option<AcademicPeriod>> {
        let tables = self.tables.lock().await;
        let mine: Vec<&AcademicPeriod> =
            tables.periods.iter().filter(|p| p.user_id == user_id).collect();
        let current = mine
            .iter()
            .rev()
            .find(|p| p.contains(today))
            .or_else(|| mine.last())
            .map(|p| (*p).clone());
        Ok(current)
    }

    async fn delete_academic_period(&self, user_id: Uuid, period_id: Uuid) -> PortResult<()> {
        let mut tables = self.tables.lock().await;
        let before = tables.periods.len();
        tables
            .periods
            .retain(|p| !(p.id == period_id && p.user_id == user_id));
        if tables.periods.len() == before {
            return Err(PortError::NotFound(format!("Academic period {} not found", period_id)));
        }
        tables
            .holidays
            .retain(|h| h.academic_period_id != Some(period_id));
        for schedule in tables.schedules.iter_mut() {
            if schedule.academic_period_id == Some(period_id) {
                schedule.academic_period_id = None;
            }
        }
        Ok(())
    }

    async fn create_holiday(&self, user_id: Uuid, holiday: NewHoliday) -> PortResult<Holiday> {
        let mut tables = self.tables.lock().await;
        if tables.holidays.iter().any(|h| {
            h.user_id == user_id
                && h.academic_period_id == holiday.academic_period_id
                && h.date == holiday.date
        }) {
            return Err(PortError::Conflict(format!(
                "A holiday already exists on {}",
                holiday.date
            )));
        }
        let created = Holiday {
            id: Uuid::new_v4(),
            user_id,
            academic_period_id: holiday.academic_period_id,
            date: holiday.date,
            reason: holiday.reason,
        };
        tables.holidays.push(created.clone());
        Ok(created)
    }

    async fn list_holidays(
        &self,
        user_id: Uuid,
        academic_period_id: Option<Uuid>,
    ) -> PortResult<Vec<Holiday>> {
        let tables = self.tables.lock().await;
        let mut holidays: Vec<_> = tables
            .holidays
            .iter()
            .filter(|h| h.user_id == user_id)
            .filter(|h| academic_period_id.map_or(true, |id| h.academic_period_id == Some(id)))
            .cloned()
            .collect();
        holidays.sort_by_key(|h| h.date);
        Ok(holidays)
    }

    async fn delete_holiday(&self, user_id: Uuid, holiday_id: Uuid) -> PortResult<()> {
        let mut tables = self.tables.lock().await;
        let before = tables.holidays.len();
        tables
            .holidays
            .retain(|h| !(h.id == holiday_id && h.user_id == user_id));
        if tables.holidays.len() == before {
            return Err(PortError::NotFound(format!("Holiday {} not found", holiday_id)));
        }
        Ok(())
    }

    async fn create_schedule(&self, schedule: NewSchedule) -> PortResult<Schedule> {
        let mut tables = self.tables.lock().await;
        let created = Schedule {
            id: Uuid::new_v4(),
            user_id: schedule.user_id,
            academic_period_id: schedule.academic_period_id,
            classes: schedule
                .classes
                .into_iter()
                .map(|c| ScheduledClass {
                    id: Uuid::new_v4(),
                    day: c.day,
                    subject_id: c.subject_id,
                    subject_name: c.subject_name,
                    class_type: c.class_type,
                    start_time: c.start_time,
                    end_time: c.end_time,
                    room: c.room,
                })
                .collect(),
            off_days: schedule.off_days,
            created_at: Utc::now(),
        };
        tables.schedules.push(created.clone());
        Ok(created)
    }

    async fn latest_schedule(&self, user_id: Uuid) -> PortResult<Option<Schedule>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .schedules
            .iter()
            .rev()
            .find(|s| s.user_id == user_id)
            .cloned())
    }

    async fn record_attendance(
        &self,
        record: NewAttendance,
    ) -> PortResult<Option<AttendanceRecord>> {
        let mut tables = self.tables.lock().await;
        let exists = tables.attendance.iter().any(|r| {
            r.user_id == record.user_id
                && r.subject_id == record.subject_id
                && r.date == record.date
                && r.schedule_class_id == record.schedule_class_id
        });
        if exists {
            return Ok(None);
        }

        let subject = tables.subject_mut(record.user_id, record.subject_id)?;
        let mut overall = ClassCounter {
            total: subject.total_classes,
            attended: subject.attended_classes,
        };
        overall.record(record.status);
        subject.total_classes = overall.total;
        subject.attended_classes = overall.attended;
        if let Some(class_type) = ClassType::from_label(&record.class_type) {
            match subject
                .class_type_stats
                .iter_mut()
                .find(|(kind, _)| *kind == class_type)
            {
                Some((_, counter)) => counter.record(record.status),
                None => {
                    let mut counter = ClassCounter::default();
                    counter.record(record.status);
                    subject.class_type_stats.push((class_type, counter));
                    subject.class_type_stats.sort_by_key(|(kind, _)| *kind);
                }
            }
        }

        let saved = AttendanceRecord {
            id: Uuid::new_v4(),
            user_id: record.user_id,
            subject_id: record.subject_id,
            date: record.date,
            status: record.status,
            class_type: record.class_type,
            schedule_class_id: record.schedule_class_id,
            is_auto_marked: record.is_auto_marked,
            time_duration: record.time_duration,
            created_at: Utc::now(),
        };
        tables.attendance.push(saved.clone());
        Ok(Some(saved))
    }

    async fn list_attendance(
        &self,
        user_id: Uuid,
        filter: AttendanceFilter,
    ) -> PortResult<Vec<AttendanceRecord>> {
        let tables = self.tables.lock().await;
        let mut records: Vec<_> = tables
            .attendance
            .iter()
            .filter(|r| r.user_id == user_id && filter.matches(r))
            .cloned()
            .collect();
        records.sort_by(|a, b| a.date.cmp(&b.date).then(a.created_at.cmp(&b.created_at)));
        Ok(records)
    }

    async fn save_notification(&self, notification: NewNotification) -> PortResult<Notification> {
        let mut tables = self.tables.lock().await;
        let saved = Notification {
            id: Uuid::new_v4(),
            user_id: notification.user_id,
            title: notification.title,
            message: notification.message,
            kind: notification.kind,
            category: notification.category,
            priority: notification.priority,
            read: false,
            created_at: Utc::now(),
        };
        tables.notifications.push(saved.clone());
        Ok(saved)
    }

    async fn list_notifications(
        &self,
        user_id: Uuid,
        unread_only: bool,
    ) -> PortResult<Vec<Notification>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .notifications
            .iter()
            .rev()
            .filter(|n| n.user_id == user_id && (!unread_only || !n.read))
            .cloned()
            .collect())
    }

    async fn mark_notification_read(
        &self,
        user_id: Uuid,
        notification_id: Uuid,
    ) -> PortResult<()> {
        let mut tables = self.tables.lock().await;
        let notification = tables
            .notifications
            .iter_mut()
            .find(|n| n.id == notification_id && n.user_id == user_id)
            .ok_or_else(|| {
                PortError::NotFound(format!("Notification {} not found", notification_id))
            })?;
        notification.read = true;
        Ok(())
    }

    async fn mark_all_notifications_read(&self, user_id: Uuid) -> PortResult<u64> {
        let mut tables = self.tables.lock().await;
        let mut updated = 0;
        for notification in tables
            .notifications
            .iter_mut()
            .filter(|n| n.user_id == user_id && !n.read)
        {
            notification.read = true;
            updated += 1;
        }
        Ok(updated)
    }

    async fn create_todo(&self, user_id: Uuid, todo: NewTodo) -> PortResult<Todo> {
        let mut tables = self.tables.lock().await;
        let created = Todo {
            id: Uuid::new_v4(),
            user_id,
            title: todo.title,
            due_date: todo.due_date,
            completed: false,
            created_at: Utc::now(),
        };
        tables.todos.push(created.clone());
        Ok(created)
    }

    async fn list_todos(&self, user_id: Uuid) -> PortResult<Vec<Todo>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .todos
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn update_todo(
        &self,
        user_id: Uuid,
        todo_id: Uuid,
        update: TodoUpdate,
    ) -> PortResult<Todo> {
        let mut tables = self.tables.lock().await;
        let todo = tables
            .todos
            .iter_mut()
            .find(|t| t.id == todo_id && t.user_id == user_id)
            .ok_or_else(|| PortError::NotFound(format!("Todo {} not found", todo_id)))?;
        if let Some(title) = update.title {
            todo.title = title;
        }
        if let Some(due_date) = update.due_date {
            todo.due_date = due_date;
        }
        if let Some(completed) = update.completed {
            todo.completed = completed;
        }
        Ok(todo.clone())
    }

    async fn delete_todo(&self, user_id: Uuid, todo_id: Uuid) -> PortResult<()> {
        let mut tables = self.tables.lock().await;
        let before = tables.todos.len();
        tables
            .todos
            .retain(|t| !(t.id == todo_id && t.user_id == user_id));
        if tables.todos.len() == before {
            return Err(PortError::NotFound(format!("Todo {} not found", todo_id)));
        }
        Ok(())
    }
}
