//! crates/attendance_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use uuid::Uuid;

//=========================================================================================
// Users and Auth
//=========================================================================================

/// Represents a user - used throughout app
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
    pub auto_attendance_enabled: bool,
    pub email_notifications: bool,
    pub schedule_pdf_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

//=========================================================================================
// Academic Structure
//=========================================================================================

/// The kinds of class that get their own counters on a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ClassType {
    Lecture,
    Tutorial,
    Laboratory,
    Practical,
    Seminar,
}

impl ClassType {
    /// Resolves a free-form label (including the short synonyms used on
    /// timetables) into a counter key.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().trim_end_matches('.').to_ascii_lowercase().as_str() {
            "lecture" | "lec" | "lect" => Some(ClassType::Lecture),
            "tutorial" | "tut" => Some(ClassType::Tutorial),
            "laboratory" | "lab" => Some(ClassType::Laboratory),
            "practical" | "prac" => Some(ClassType::Practical),
            "seminar" => Some(ClassType::Seminar),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ClassType::Lecture => "Lecture",
            ClassType::Tutorial => "Tutorial",
            ClassType::Laboratory => "Laboratory",
            ClassType::Practical => "Practical",
            ClassType::Seminar => "Seminar",
        }
    }
}

/// Total/attended pair kept per subject and per class type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassCounter {
    pub total: u32,
    pub attended: u32,
}

impl ClassCounter {
    pub fn record(&mut self, status: AttendanceStatus) {
        self.total += 1;
        if status == AttendanceStatus::Present {
            self.attended += 1;
        }
    }
}

#[derive(Debug, Clone)]
pub struct Subject {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub code: Option<String>,
    pub total_classes: u32,
    pub attended_classes: u32,
    /// Per-class-type breakdown, only for recognised types.
    pub class_type_stats: Vec<(ClassType, ClassCounter)>,
    pub created_at: DateTime<Utc>,
}

impl Subject {
    /// Attendance percentage, or `None` before the first class.
    pub fn attendance_percentage(&self) -> Option<f64> {
        if self.total_classes == 0 {
            return None;
        }
        Some(self.attended_classes as f64 * 100.0 / self.total_classes as f64)
    }
}

#[derive(Debug, Clone)]
pub struct NewSubject {
    pub name: String,
    pub code: Option<String>,
}

/// A user's semester window. `start_date <= end_date` always holds.
#[derive(Debug, Clone)]
pub struct AcademicPeriod {
    pub id: Uuid,
    pub user_id: Uuid,
    pub semester: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl AcademicPeriod {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    pub fn has_ended(&self, today: NaiveDate) -> bool {
        today > self.end_date
    }
}

#[derive(Debug, Clone)]
pub struct NewAcademicPeriod {
    pub semester: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct Holiday {
    pub id: Uuid,
    pub user_id: Uuid,
    pub academic_period_id: Option<Uuid>,
    pub date: NaiveDate,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct NewHoliday {
    pub academic_period_id: Option<Uuid>,
    pub date: NaiveDate,
    pub reason: String,
}

//=========================================================================================
// Schedules
//=========================================================================================

/// One weekly time slot of a subject.
#[derive(Debug, Clone)]
pub struct ScheduledClass {
    pub id: Uuid,
    pub day: Weekday,
    pub subject_id: Uuid,
    pub subject_name: String,
    pub class_type: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub room: Option<String>,
}

impl ScheduledClass {
    /// The `HH:MM-HH:MM` label stored on attendance records.
    pub fn time_duration(&self) -> String {
        format!(
            "{}-{}",
            self.start_time.format("%H:%M"),
            self.end_time.format("%H:%M")
        )
    }
}

/// A weekly timetable. Re-creating a schedule supersedes the previous one.
#[derive(Debug, Clone)]
pub struct Schedule {
    pub id: Uuid,
    pub user_id: Uuid,
    pub academic_period_id: Option<Uuid>,
    pub classes: Vec<ScheduledClass>,
    pub off_days: Vec<Weekday>,
    pub created_at: DateTime<Utc>,
}

impl Schedule {
    pub fn classes_on(&self, day: Weekday) -> impl Iterator<Item = &ScheduledClass> {
        self.classes.iter().filter(move |c| c.day == day)
    }
}

#[derive(Debug, Clone)]
pub struct NewScheduledClass {
    pub day: Weekday,
    pub subject_id: Uuid,
    pub subject_name: String,
    pub class_type: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub room: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewSchedule {
    pub user_id: Uuid,
    pub academic_period_id: Option<Uuid>,
    pub classes: Vec<NewScheduledClass>,
    pub off_days: Vec<Weekday>,
}

//=========================================================================================
// Attendance
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttendanceStatus {
    Present,
    Absent,
}

impl AttendanceStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "present" => Some(AttendanceStatus::Present),
            "absent" => Some(AttendanceStatus::Absent),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
        }
    }
}

/// Unique per (user, subject, date, schedule_class_id).
#[derive(Debug, Clone)]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub subject_id: Uuid,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub class_type: String,
    pub schedule_class_id: Option<Uuid>,
    pub is_auto_marked: bool,
    pub time_duration: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAttendance {
    pub user_id: Uuid,
    pub subject_id: Uuid,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub class_type: String,
    pub schedule_class_id: Option<Uuid>,
    pub is_auto_marked: bool,
    pub time_duration: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AttendanceFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub subject_id: Option<Uuid>,
}

impl AttendanceFilter {
    pub fn matches(&self, record: &AttendanceRecord) -> bool {
        self.from.map_or(true, |from| record.date >= from)
            && self.to.map_or(true, |to| record.date <= to)
            && self.subject_id.map_or(true, |id| record.subject_id == id)
    }
}

//=========================================================================================
// Notifications and Todos
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationPriority {
    Low,
    Normal,
    High,
}

impl NotificationPriority {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "low" => Some(NotificationPriority::Low),
            "normal" => Some(NotificationPriority::Normal),
            "high" => Some(NotificationPriority::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationPriority::Low => "low",
            NotificationPriority::Normal => "normal",
            NotificationPriority::High => "high",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub kind: String,
    pub category: String,
    pub priority: NotificationPriority,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub kind: String,
    pub category: String,
    pub priority: NotificationPriority,
}

#[derive(Debug, Clone)]
pub struct Todo {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub due_date: Option<NaiveDate>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTodo {
    pub title: String,
    pub due_date: Option<NaiveDate>,
}

/// Partial update; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct TodoUpdate {
    pub title: Option<String>,
    pub due_date: Option<Option<NaiveDate>>,
    pub completed: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_type_synonyms_resolve_to_counter_keys() {
        assert_eq!(ClassType::from_label("Tut"), Some(ClassType::Tutorial));
        assert_eq!(ClassType::from_label("prac."), Some(ClassType::Practical));
        assert_eq!(ClassType::from_label("LAB"), Some(ClassType::Laboratory));
        assert_eq!(ClassType::from_label("Lecture"), Some(ClassType::Lecture));
        assert_eq!(ClassType::from_label("Workshop"), None);
    }

    #[test]
    fn counter_only_counts_present_as_attended() {
        let mut counter = ClassCounter::default();
        counter.record(AttendanceStatus::Present);
        counter.record(AttendanceStatus::Absent);
        assert_eq!(counter, ClassCounter { total: 2, attended: 1 });
    }

    #[test]
    fn period_end_is_inclusive() {
        let period = AcademicPeriod {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            semester: "Fall".into(),
            start_date: NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 12, 20).unwrap(),
            created_at: Utc::now(),
        };
        assert!(!period.has_ended(NaiveDate::from_ymd_opt(2024, 12, 20).unwrap()));
        assert!(period.has_ended(NaiveDate::from_ymd_opt(2024, 12, 21).unwrap()));
        assert!(period.contains(NaiveDate::from_ymd_opt(2024, 9, 1).unwrap()));
    }
}
