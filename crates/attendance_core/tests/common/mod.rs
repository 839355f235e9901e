#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use attendance_core::domain::{NewAcademicPeriod, NewSchedule, NewScheduledClass, NewSubject};
use attendance_core::{
    AutoAttendance, DatabaseService, InMemoryStore, Mailer, Notifier, PortResult, Schedule,
    Subject, User,
};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use tokio::sync::Mutex;

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<(String, String, String)>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> PortResult<()> {
        self.sent
            .lock()
            .await
            .push((to.to_string(), subject.to_string(), body.to_string()));
        Ok(())
    }
}

pub struct Fixture {
    pub store: Arc<InMemoryStore>,
    pub mailer: Arc<RecordingMailer>,
    pub auto: AutoAttendance,
    pub user: User,
}

impl Fixture {
    pub async fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let mailer = Arc::new(RecordingMailer::default());
        let notifier = Notifier::new(store.clone(), mailer.clone());
        let auto = AutoAttendance::new(store.clone(), notifier);
        let user = store
            .create_user_with_email("student@example.com", "hash")
            .await
            .unwrap();
        Self {
            store,
            mailer,
            auto,
            user,
        }
    }

    pub async fn subject(&self, name: &str) -> Subject {
        self.store
            .create_subject(
                self.user.user_id,
                NewSubject {
                    name: name.to_string(),
                    code: None,
                },
            )
            .await
            .unwrap()
    }

    pub async fn period(&self, start: NaiveDate, end: NaiveDate) -> uuid::Uuid {
        self.store
            .create_academic_period(
                self.user.user_id,
                NewAcademicPeriod {
                    semester: "Spring".to_string(),
                    start_date: start,
                    end_date: end,
                },
            )
            .await
            .unwrap()
            .id
    }

    pub async fn schedule(
        &self,
        period: Option<uuid::Uuid>,
        classes: Vec<NewScheduledClass>,
        off_days: Vec<Weekday>,
    ) -> Schedule {
        self.store
            .create_schedule(NewSchedule {
                user_id: self.user.user_id,
                academic_period_id: period,
                classes,
                off_days,
            })
            .await
            .unwrap()
    }
}

pub fn class(subject: &Subject, day: Weekday, start: &str, end: &str) -> NewScheduledClass {
    NewScheduledClass {
        day,
        subject_id: subject.id,
        subject_name: subject.name.clone(),
        class_type: "Lecture".to_string(),
        start_time: NaiveTime::parse_from_str(start, "%H:%M").unwrap(),
        end_time: NaiveTime::parse_from_str(end, "%H:%M").unwrap(),
        room: None,
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn at(day: NaiveDate, time: &str) -> NaiveDateTime {
    day.and_time(NaiveTime::parse_from_str(time, "%H:%M").unwrap())
}
