mod common;

use attendance_core::{AttendanceStatus, ClassCounter, ClassType, DatabaseService, DayRecord};
use chrono::NaiveDate;
use common::{date, Fixture};
use uuid::Uuid;

fn record(subject_id: Uuid, day: NaiveDate, slot: Option<Uuid>, status: AttendanceStatus) -> DayRecord {
    DayRecord {
        subject_id,
        date: day,
        status,
        class_type: "Lecture".to_string(),
        schedule_class_id: slot,
        time_duration: Some("09:00-10:00".to_string()),
        preparatory: false,
    }
}

#[tokio::test]
async fn duplicate_records_are_persisted_once() {
    let fx = Fixture::new().await;
    let physics = fx.subject("Physics").await;
    let slot = Some(Uuid::new_v4());
    let day = date(2024, 3, 4);

    let created = fx
        .auto
        .upload_day_records(
            fx.user.user_id,
            vec![
                record(physics.id, day, slot, AttendanceStatus::Present),
                record(physics.id, day, slot, AttendanceStatus::Absent),
            ],
        )
        .await
        .unwrap();

    assert_eq!(created.len(), 1);
    assert_eq!(created[0].status, AttendanceStatus::Present);
    let subject = fx.store.get_subject(fx.user.user_id, physics.id).await.unwrap();
    assert_eq!(subject.total_classes, 1);
    assert_eq!(subject.attended_classes, 1);

    let again = fx
        .auto
        .upload_day_records(
            fx.user.user_id,
            vec![record(physics.id, day, slot, AttendanceStatus::Absent)],
        )
        .await
        .unwrap();
    assert!(again.is_empty());
}

#[tokio::test]
async fn preparatory_records_go_to_their_own_subject() {
    let fx = Fixture::new().await;
    let physics = fx.subject("Physics").await;
    let mut tagged = record(physics.id, date(2024, 3, 4), None, AttendanceStatus::Present);
    tagged.preparatory = true;

    let created = fx.auto.upload_day_records(fx.user.user_id, vec![tagged]).await.unwrap();
    assert_eq!(created.len(), 1);
    assert_ne!(created[0].subject_id, physics.id);

    let subjects = fx.store.list_subjects(fx.user.user_id).await.unwrap();
    let preparatory = subjects.iter().find(|s| s.name == "Preparatory").unwrap();
    assert_eq!(preparatory.id, created[0].subject_id);
    assert_eq!(preparatory.total_classes, 1);
    let physics = fx.store.get_subject(fx.user.user_id, physics.id).await.unwrap();
    assert_eq!(physics.total_classes, 0);
}

#[tokio::test]
async fn one_grouped_notification_per_upload() {
    let fx = Fixture::new().await;
    let physics = fx.subject("Physics").await;
    let maths = fx.subject("Maths").await;

    fx.auto
        .upload_day_records(
            fx.user.user_id,
            vec![
                record(physics.id, date(2024, 3, 5), None, AttendanceStatus::Present),
                record(maths.id, date(2024, 3, 4), None, AttendanceStatus::Absent),
                record(Uuid::new_v4(), date(2024, 3, 4), None, AttendanceStatus::Present),
            ],
        )
        .await
        .unwrap();

    let notifications = fx.store.list_notifications(fx.user.user_id, false).await.unwrap();
    assert_eq!(notifications.len(), 1);
    let message = &notifications[0].message;
    assert!(message.starts_with("Saved attendance for 2 classes."));
    assert!(message.contains("- Maths (09:00-10:00): absent"));
    assert!(message.contains("- Physics (09:00-10:00): present"));
    assert!(message.find("2024-03-04").unwrap() < message.find("2024-03-05").unwrap());
}

#[tokio::test]
async fn class_type_counters_follow_synonyms() {
    let fx = Fixture::new().await;
    let maths = fx.subject("Maths").await;
    let mut tutorial = record(maths.id, date(2024, 3, 4), None, AttendanceStatus::Absent);
    tutorial.class_type = "Tut".to_string();
    let mut workshop = record(maths.id, date(2024, 3, 5), None, AttendanceStatus::Present);
    workshop.class_type = "Workshop".to_string();

    fx.auto
        .upload_day_records(fx.user.user_id, vec![tutorial, workshop])
        .await
        .unwrap();

    let maths = fx.store.get_subject(fx.user.user_id, maths.id).await.unwrap();
    assert_eq!(maths.total_classes, 2);
    assert_eq!(maths.attended_classes, 1);
    assert_eq!(
        maths.class_type_stats,
        vec![(ClassType::Tutorial, ClassCounter { total: 1, attended: 0 })]
    );
}
