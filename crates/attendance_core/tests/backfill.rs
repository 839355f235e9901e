mod common;

use attendance_core::{AttendanceFilter, AttendanceStatus, DatabaseService};
use chrono::{DateTime, Datelike, Local, TimeZone, Utc, Weekday};
use common::{at, class, date, Fixture};
use uuid::Uuid;

#[tokio::test]
async fn class_is_marked_only_after_it_ends() {
    let fx = Fixture::new().await;
    let physics = fx.subject("Physics").await;
    let period = fx.period(date(2024, 3, 4), date(2024, 6, 28)).await;
    fx.schedule(Some(period), vec![class(&physics, Weekday::Mon, "09:00", "10:00")], vec![])
        .await;

    let monday = date(2024, 3, 4);
    let early = fx.auto.mark_past_classes(fx.user.user_id, at(monday, "09:30")).await.unwrap();
    assert!(early.created.is_empty());

    let later = fx.auto.mark_past_classes(fx.user.user_id, at(monday, "10:30")).await.unwrap();
    assert_eq!(later.created.len(), 1);
    let record = &later.created[0];
    assert_eq!(record.date, monday);
    assert_eq!(record.status, AttendanceStatus::Present);
    assert!(record.is_auto_marked);
    assert_eq!(record.time_duration.as_deref(), Some("09:00-10:00"));
    assert_eq!(later.range, Some((monday, monday)));
}

#[tokio::test]
async fn running_twice_creates_nothing_new() {
    let fx = Fixture::new().await;
    let physics = fx.subject("Physics").await;
    let period = fx.period(date(2024, 3, 4), date(2024, 6, 28)).await;
    fx.schedule(Some(period), vec![class(&physics, Weekday::Mon, "09:00", "10:00")], vec![])
        .await;

    let now = at(date(2024, 3, 20), "12:00");
    let first = fx.auto.mark_past_classes(fx.user.user_id, now).await.unwrap();
    assert_eq!(first.created.len(), 3);

    let second = fx.auto.mark_past_classes(fx.user.user_id, now).await.unwrap();
    assert!(second.created.is_empty());
    assert_eq!(second.message, "All past classes are already marked");

    let subject = fx.store.get_subject(fx.user.user_id, physics.id).await.unwrap();
    assert_eq!(subject.total_classes, 3);
    assert_eq!(subject.attended_classes, 3);
    let records = fx
        .store
        .list_attendance(fx.user.user_id, AttendanceFilter::default())
        .await
        .unwrap();
    assert_eq!(records.len(), 3);
}

#[tokio::test]
async fn ended_period_produces_nothing() {
    let fx = Fixture::new().await;
    let physics = fx.subject("Physics").await;
    let period = fx.period(date(2024, 1, 8), date(2024, 2, 29)).await;
    fx.schedule(Some(period), vec![class(&physics, Weekday::Mon, "09:00", "10:00")], vec![])
        .await;

    for day in [date(2024, 3, 1), date(2024, 3, 20)] {
        let outcome = fx.auto.mark_past_classes(fx.user.user_id, at(day, "18:00")).await.unwrap();
        assert!(outcome.created.is_empty());
        assert!(outcome.message.contains("no longer active"));
    }
}

#[tokio::test]
async fn off_days_and_holidays_are_skipped() {
    let fx = Fixture::new().await;
    let physics = fx.subject("Physics").await;
    let period = fx.period(date(2024, 3, 4), date(2024, 6, 28)).await;
    fx.schedule(
        Some(period),
        vec![
            class(&physics, Weekday::Mon, "09:00", "10:00"),
            class(&physics, Weekday::Sat, "09:00", "10:00"),
        ],
        vec![Weekday::Sat],
    )
    .await;
    let holiday = date(2024, 3, 11);
    fx.store
        .create_holiday(
            fx.user.user_id,
            attendance_core::domain::NewHoliday {
                academic_period_id: Some(period),
                date: holiday,
                reason: "Spring break".to_string(),
            },
        )
        .await
        .unwrap();

    let outcome = fx
        .auto
        .mark_past_classes(fx.user.user_id, at(date(2024, 3, 24), "23:00"))
        .await
        .unwrap();

    let dates: Vec<_> = outcome.created.iter().map(|r| r.date).collect();
    assert_eq!(dates, vec![date(2024, 3, 4), date(2024, 3, 18)]);
    assert!(outcome.created.iter().all(|r| r.date.weekday() != Weekday::Sat));
    assert!(!dates.contains(&holiday));
}

#[tokio::test]
async fn classes_with_missing_subjects_are_skipped() {
    let fx = Fixture::new().await;
    let physics = fx.subject("Physics").await;
    let mut ghost = class(&physics, Weekday::Mon, "11:00", "12:00");
    ghost.subject_id = Uuid::new_v4();
    ghost.subject_name = "Dropped Course".to_string();
    let period = fx.period(date(2024, 3, 4), date(2024, 6, 28)).await;
    fx.schedule(
        Some(period),
        vec![class(&physics, Weekday::Mon, "09:00", "10:00"), ghost],
        vec![],
    )
    .await;

    let outcome = fx
        .auto
        .mark_past_classes(fx.user.user_id, at(date(2024, 3, 4), "18:00"))
        .await
        .unwrap();
    assert_eq!(outcome.created.len(), 1);
    assert_eq!(outcome.created[0].subject_id, physics.id);
}

#[tokio::test]
async fn one_summary_notification_per_run() {
    let fx = Fixture::new().await;
    let physics = fx.subject("Physics").await;
    let maths = fx.subject("Maths").await;
    let period = fx.period(date(2024, 3, 4), date(2024, 6, 28)).await;
    fx.schedule(
        Some(period),
        vec![
            class(&physics, Weekday::Mon, "09:00", "10:00"),
            class(&maths, Weekday::Tue, "10:00", "11:00"),
        ],
        vec![],
    )
    .await;

    let outcome = fx
        .auto
        .mark_past_classes(fx.user.user_id, at(date(2024, 3, 20), "08:00"))
        .await
        .unwrap();
    assert_eq!(outcome.created.len(), 6);

    let notifications = fx.store.list_notifications(fx.user.user_id, false).await.unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].title, "Attendance auto-marked");
    assert!(notifications[0].message.contains("Marked 6 past classes"));
    assert!(notifications[0].message.contains("2024-03-04 and 2024-03-19"));
    assert_eq!(fx.mailer.sent.lock().await.len(), 1);
}

#[tokio::test]
async fn missing_schedule_is_not_an_error() {
    let fx = Fixture::new().await;
    let outcome = fx
        .auto
        .mark_past_classes(fx.user.user_id, at(date(2024, 3, 4), "18:00"))
        .await
        .unwrap();
    assert!(outcome.created.is_empty());
    assert_eq!(outcome.message, "No schedule found for the current semester");
    assert!(fx.store.list_notifications(fx.user.user_id, false).await.unwrap().is_empty());
}

#[tokio::test]
async fn without_a_period_the_schedule_creation_date_is_the_start() {
    let fx = Fixture::new().await;
    let physics = fx.subject("Physics").await;
    let schedule = fx
        .schedule(None, vec![class(&physics, Weekday::Mon, "09:00", "10:00")], vec![])
        .await;
    fx.store
        .set_schedule_created_at(schedule.id, local(2024, 3, 11, 8, 0))
        .await;

    let outcome = fx
        .auto
        .mark_past_classes(fx.user.user_id, at(date(2024, 3, 20), "12:00"))
        .await
        .unwrap();
    let dates: Vec<_> = outcome.created.iter().map(|r| r.date).collect();
    assert_eq!(dates, vec![date(2024, 3, 11), date(2024, 3, 18)]);
}

#[tokio::test]
async fn a_late_night_schedule_starts_on_its_local_date() {
    let fx = Fixture::new().await;
    let physics = fx.subject("Physics").await;
    let schedule = fx
        .schedule(None, vec![class(&physics, Weekday::Mon, "09:00", "10:00")], vec![])
        .await;
    // Monday 23:30 local is already Tuesday in UTC for zones west of Greenwich.
    fx.store
        .set_schedule_created_at(schedule.id, local(2024, 3, 11, 23, 30))
        .await;

    let outcome = fx
        .auto
        .mark_past_classes(fx.user.user_id, at(date(2024, 3, 13), "12:00"))
        .await
        .unwrap();
    let dates: Vec<_> = outcome.created.iter().map(|r| r.date).collect();
    assert_eq!(dates, vec![date(2024, 3, 11)]);
}

fn local(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Local
        .with_ymd_and_hms(year, month, day, hour, minute, 0)
        .unwrap()
        .with_timezone(&Utc)
}
