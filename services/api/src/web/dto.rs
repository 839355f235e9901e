//! services/api/src/web/dto.rs
//!
//! Request and response payloads of the REST API. Domain types stay free of
//! serialization concerns; everything on the wire is camelCase JSON.

use attendance_core::auto_attendance::BackfillOutcome;
use attendance_core::calendar::weekday_name;
use attendance_core::domain::{
    AcademicPeriod, AttendanceRecord, Holiday, Notification, Schedule, Subject, Todo,
};
use attendance_core::schedule_parser::ScheduleItem;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::web::error::HttpError;

//=========================================================================================
// Validation Helpers
//=========================================================================================

/// Collects field problems so a request reports all of them at once.
#[derive(Debug, Default)]
pub struct Problems(Vec<String>);

impl Problems {
    pub fn push(&mut self, detail: impl Into<String>) {
        self.0.push(detail.into());
    }

    /// A non-blank string, trimmed.
    pub fn required(&mut self, field: &str, value: Option<&str>) -> Option<String> {
        match value.map(str::trim) {
            Some(v) if !v.is_empty() => Some(v.to_string()),
            _ => {
                self.push(format!("{} is required", field));
                None
            }
        }
    }

    /// A `YYYY-MM-DD` date; absent values are reported when `required`.
    pub fn date(&mut self, field: &str, value: Option<&str>, required: bool) -> Option<NaiveDate> {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            Some(v) => match NaiveDate::parse_from_str(v, "%Y-%m-%d") {
                Ok(date) => Some(date),
                Err(_) => {
                    self.push(format!("{} must be a date in YYYY-MM-DD format", field));
                    None
                }
            },
            None => {
                if required {
                    self.push(format!("{} is required", field));
                }
                None
            }
        }
    }

    pub fn finish(self) -> Result<(), HttpError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(HttpError::Validation(self.0))
        }
    }
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

//=========================================================================================
// Common
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

//=========================================================================================
// Subjects
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubjectRequest {
    pub name: Option<String>,
    pub code: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClassTypeStatResponse {
    pub class_type: String,
    pub total: u32,
    pub attended: u32,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubjectResponse {
    pub id: Uuid,
    pub name: String,
    pub code: Option<String>,
    pub total_classes: u32,
    pub attended_classes: u32,
    pub attendance_percentage: Option<f64>,
    pub class_type_stats: Vec<ClassTypeStatResponse>,
}

impl From<Subject> for SubjectResponse {
    fn from(subject: Subject) -> Self {
        let attendance_percentage = subject.attendance_percentage();
        Self {
            id: subject.id,
            name: subject.name,
            code: subject.code,
            total_classes: subject.total_classes,
            attended_classes: subject.attended_classes,
            attendance_percentage,
            class_type_stats: subject
                .class_type_stats
                .into_iter()
                .map(|(kind, counter)| ClassTypeStatResponse {
                    class_type: kind.as_str().to_string(),
                    total: counter.total,
                    attended: counter.attended,
                })
                .collect(),
        }
    }
}

//=========================================================================================
// Academic Periods and Holidays
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AcademicPeriodRequest {
    pub semester: Option<String>,
    /// `YYYY-MM-DD`
    pub start_date: Option<String>,
    /// `YYYY-MM-DD`
    pub end_date: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AcademicPeriodResponse {
    pub id: Uuid,
    pub semester: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl From<AcademicPeriod> for AcademicPeriodResponse {
    fn from(period: AcademicPeriod) -> Self {
        Self {
            id: period.id,
            semester: period.semester,
            start_date: period.start_date,
            end_date: period.end_date,
            created_at: period.created_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HolidayRequest {
    pub academic_period_id: Option<Uuid>,
    pub date: Option<String>,
    pub reason: Option<String>,
}

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct HolidayQuery {
    pub academic_period_id: Option<Uuid>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HolidayResponse {
    pub id: Uuid,
    pub academic_period_id: Option<Uuid>,
    pub date: NaiveDate,
    pub reason: String,
}

impl From<Holiday> for HolidayResponse {
    fn from(holiday: Holiday) -> Self {
        Self {
            id: holiday.id,
            academic_period_id: holiday.academic_period_id,
            date: holiday.date,
            reason: holiday.reason,
        }
    }
}

//=========================================================================================
// Schedules
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledClassRequest {
    pub day: Option<String>,
    /// `HH:MM`; may be omitted when `time` is given.
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    /// A range such as `09:00 - 10:00`, as returned by the PDF upload.
    pub time: Option<String>,
    pub subject_id: Option<Uuid>,
    pub subject_name: Option<String>,
    pub class_type: Option<String>,
    pub room: Option<String>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRequest {
    pub academic_period_id: Option<Uuid>,
    #[serde(default)]
    pub off_days: Vec<String>,
    #[serde(default)]
    pub classes: Vec<ScheduledClassRequest>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledClassResponse {
    pub id: Uuid,
    pub day: String,
    pub subject_id: Uuid,
    pub subject_name: String,
    pub class_type: String,
    pub start_time: String,
    pub end_time: String,
    pub room: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleResponse {
    pub id: Uuid,
    pub academic_period_id: Option<Uuid>,
    pub off_days: Vec<String>,
    pub classes: Vec<ScheduledClassResponse>,
    pub created_at: DateTime<Utc>,
}

impl From<Schedule> for ScheduleResponse {
    fn from(schedule: Schedule) -> Self {
        Self {
            id: schedule.id,
            academic_period_id: schedule.academic_period_id,
            off_days: schedule
                .off_days
                .iter()
                .map(|d| weekday_name(*d).to_string())
                .collect(),
            classes: schedule
                .classes
                .into_iter()
                .map(|c| ScheduledClassResponse {
                    id: c.id,
                    day: weekday_name(c.day).to_string(),
                    subject_id: c.subject_id,
                    subject_name: c.subject_name,
                    class_type: c.class_type,
                    start_time: c.start_time.format("%H:%M").to_string(),
                    end_time: c.end_time.format("%H:%M").to_string(),
                    room: c.room,
                })
                .collect(),
            created_at: schedule.created_at,
        }
    }
}

//=========================================================================================
// Attendance
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRequest {
    pub subject_id: Option<Uuid>,
    pub date: Option<String>,
    /// `present` or `absent`
    pub status: Option<String>,
    pub class_type: Option<String>,
    pub schedule_class_id: Option<Uuid>,
    pub time_duration: Option<String>,
    /// Routes the record to the shared preparatory subject.
    #[serde(default)]
    pub preparatory: bool,
}

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceQuery {
    /// `YYYY-MM-DD`
    pub from: Option<String>,
    /// `YYYY-MM-DD`
    pub to: Option<String>,
    pub subject_id: Option<Uuid>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceResponse {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub date: NaiveDate,
    pub status: String,
    pub class_type: String,
    pub schedule_class_id: Option<Uuid>,
    pub is_auto_marked: bool,
    pub time_duration: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<AttendanceRecord> for AttendanceResponse {
    fn from(record: AttendanceRecord) -> Self {
        Self {
            id: record.id,
            subject_id: record.subject_id,
            date: record.date,
            status: record.status.as_str().to_string(),
            class_type: record.class_type,
            schedule_class_id: record.schedule_class_id,
            is_auto_marked: record.is_auto_marked,
            time_duration: record.time_duration,
            created_at: record.created_at,
        }
    }
}

//=========================================================================================
// Auto Attendance
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ToggleRequest {
    /// Omit to flip the current setting.
    pub enabled: Option<bool>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AutoAttendanceStatusResponse {
    pub enabled: bool,
    pub has_schedule: bool,
    /// Number of weekly classes in the latest schedule.
    pub class_count: usize,
    pub schedule_created_at: Option<DateTime<Utc>>,
    pub current_period: Option<AcademicPeriodResponse>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ToggleResponse {
    pub enabled: bool,
    /// Present when the toggle switched the feature on.
    pub backfill: Option<MarkPastResponse>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarkPastResponse {
    pub created: usize,
    pub message: String,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub records: Vec<AttendanceResponse>,
}

impl From<BackfillOutcome> for MarkPastResponse {
    fn from(outcome: BackfillOutcome) -> Self {
        let (from, to) = outcome.range.unzip();
        Self {
            created: outcome.created.len(),
            message: outcome.message,
            from,
            to,
            records: outcome.created.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkUploadRequest {
    #[serde(default)]
    pub records: Vec<AttendanceRequest>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkUploadResponse {
    pub saved: usize,
    pub records: Vec<AttendanceResponse>,
}

//=========================================================================================
// Uploads
//=========================================================================================

/// Documents the multipart body of the schedule upload.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct ScheduleUploadForm {
    /// The timetable PDF.
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleItemResponse {
    pub day: String,
    pub time: String,
    pub subject: String,
    pub room: Option<String>,
    pub class_type: Option<String>,
    pub is_fallback: bool,
}

impl From<ScheduleItem> for ScheduleItemResponse {
    fn from(item: ScheduleItem) -> Self {
        Self {
            day: weekday_name(item.day).to_string(),
            time: item.time,
            subject: item.subject,
            room: item.room,
            class_type: item.class_type,
            is_fallback: item.is_fallback,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleUploadResponse {
    pub strategy: String,
    pub items: Vec<ScheduleItemResponse>,
}

//=========================================================================================
// Notifications and Todos
//=========================================================================================

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub category: String,
    pub priority: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Notification> for NotificationResponse {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id,
            title: n.title,
            message: n.message,
            kind: n.kind,
            category: n.category,
            priority: n.priority.as_str().to_string(),
            read: n.read,
            created_at: n.created_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesRequest {
    pub email_notifications: Option<bool>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesResponse {
    pub email_notifications: bool,
}

#[derive(Serialize, ToSchema)]
pub struct ReadAllResponse {
    pub updated: u64,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TodoRequest {
    pub title: Option<String>,
    pub due_date: Option<String>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TodoUpdateRequest {
    pub title: Option<String>,
    /// `null` clears the due date; omitting the field leaves it unchanged.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub due_date: Option<Option<String>>,
    pub completed: Option<bool>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TodoResponse {
    pub id: Uuid,
    pub title: String,
    pub due_date: Option<NaiveDate>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Todo> for TodoResponse {
    fn from(todo: Todo) -> Self {
        Self {
            id: todo.id,
            title: todo.title,
            due_date: todo.due_date,
            completed: todo.completed,
            created_at: todo.created_at,
        }
    }
}

//=========================================================================================
// Chat
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct ChatRequest {
    pub message: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ChatResponse {
    pub reply: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn problems_collect_every_field() {
        let mut problems = Problems::default();
        assert_eq!(problems.required("name", Some("  Maths ")), Some("Maths".to_string()));
        assert_eq!(problems.required("semester", Some("   ")), None);
        assert_eq!(problems.date("startDate", Some("2024-13-01"), true), None);
        assert_eq!(problems.date("endDate", None, false), None);
        match problems.finish() {
            Err(HttpError::Validation(details)) => {
                assert_eq!(details.len(), 2);
                assert!(details[1].contains("YYYY-MM-DD"));
            }
            _ => panic!("expected validation failure"),
        }
    }

    #[test]
    fn todo_update_tells_null_from_missing() {
        let cleared: TodoUpdateRequest = serde_json::from_str(r#"{"dueDate": null}"#).unwrap();
        assert_eq!(cleared.due_date, Some(None));
        let untouched: TodoUpdateRequest = serde_json::from_str(r#"{"completed": true}"#).unwrap();
        assert_eq!(untouched.due_date, None);
    }
}
