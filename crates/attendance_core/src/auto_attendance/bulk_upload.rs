use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{AutoAttendance, PREPARATORY_SUBJECT};
use crate::domain::{AttendanceRecord, AttendanceStatus, NewAttendance, Subject};
use crate::ports::PortResult;

/// A record produced by the client at the end of the day.
#[derive(Debug, Clone)]
pub struct DayRecord {
    pub subject_id: Uuid,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub class_type: String,
    pub schedule_class_id: Option<Uuid>,
    pub time_duration: Option<String>,
    pub preparatory: bool,
}

impl DayRecord {
    fn is_preparatory(&self) -> bool {
        self.preparatory
            || self
                .class_type
                .trim()
                .eq_ignore_ascii_case(PREPARATORY_SUBJECT)
    }
}

impl AutoAttendance {
    /// Persists a day's worth of records, skipping slots that already have one,
    /// and sends a single notification grouped by date.
    pub async fn upload_day_records(
        &self,
        user_id: Uuid,
        records: Vec<DayRecord>,
    ) -> PortResult<Vec<AttendanceRecord>> {
        let mut preparatory: Option<Subject> = None;
        let mut created = Vec::new();
        let mut lines: BTreeMap<NaiveDate, Vec<String>> = BTreeMap::new();

        for record in records {
            let subject = if record.is_preparatory() {
                match &preparatory {
                    Some(subject) => subject.clone(),
                    None => match self
                        .db
                        .find_or_create_subject(user_id, PREPARATORY_SUBJECT)
                        .await
                    {
                        Ok(subject) => {
                            preparatory = Some(subject.clone());
                            subject
                        }
                        Err(e) => {
                            warn!("Could not resolve the preparatory subject: {}", e);
                            continue;
                        }
                    },
                }
            } else {
                match self.db.get_subject(user_id, record.subject_id).await {
                    Ok(subject) => subject,
                    Err(e) => {
                        warn!("Skipping record for subject {}: {}", record.subject_id, e);
                        continue;
                    }
                }
            };

            let new_record = NewAttendance {
                user_id,
                subject_id: subject.id,
                date: record.date,
                status: record.status,
                class_type: record.class_type.clone(),
                schedule_class_id: record.schedule_class_id,
                is_auto_marked: true,
                time_duration: record.time_duration.clone(),
            };
            match self.db.record_attendance(new_record).await {
                Ok(Some(saved)) => {
                    lines.entry(saved.date).or_default().push(format!(
                        "- {} ({}): {}",
                        subject.name,
                        saved.time_duration.as_deref().unwrap_or("no time"),
                        saved.status.as_str()
                    ));
                    created.push(saved);
                }
                Ok(None) => debug!(
                    "Record for {} on {} already exists",
                    subject.name, record.date
                ),
                Err(e) => warn!("Failed to save record for {}: {}", subject.name, e),
            }
        }

        if !created.is_empty() {
            info!("User {} uploaded {} attendance records", user_id, created.len());
            let message = grouped_message(created.len(), &lines);
            if let Err(e) = self
                .notifier
                .notify_attendance(user_id, "Attendance uploaded", message)
                .await
            {
                warn!("Failed to send upload notification to {}: {}", user_id, e);
            }
        }

        Ok(created)
    }
}

fn grouped_message(count: usize, lines: &BTreeMap<NaiveDate, Vec<String>>) -> String {
    let mut message = format!(
        "Saved attendance for {} class{}.",
        count,
        if count == 1 { "" } else { "es" }
    );
    for (date, entries) in lines {
        message.push_str(&format!("\n\n{}:", date));
        for entry in entries {
            message.push('\n');
            message.push_str(entry);
        }
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grouped_message_lists_dates_in_order() {
        let mut lines = BTreeMap::new();
        let d2 = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let d1 = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        lines.insert(d2, vec!["- Maths (10:00-11:00): absent".to_string()]);
        lines.insert(d1, vec!["- Physics (09:00-10:00): present".to_string()]);

        let message = grouped_message(2, &lines);
        let first = message.find("2024-03-04").unwrap();
        let second = message.find("2024-03-05").unwrap();
        assert!(first < second);
        assert!(message.starts_with("Saved attendance for 2 classes."));
    }

    #[test]
    fn preparatory_tag_comes_from_flag_or_class_type() {
        let mut record = DayRecord {
            subject_id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            status: AttendanceStatus::Present,
            class_type: "preparatory".to_string(),
            schedule_class_id: None,
            time_duration: None,
            preparatory: false,
        };
        assert!(record.is_preparatory());
        record.class_type = "Lecture".to_string();
        assert!(!record.is_preparatory());
        record.preparatory = true;
        assert!(record.is_preparatory());
    }
}
