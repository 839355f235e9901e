mod common;

use attendance_core::digest::{build_digest, send_digests, DigestPeriod};
use attendance_core::domain::{NewNotification, NotificationPriority};
use attendance_core::{AttendanceStatus, DatabaseService, DayRecord, Notifier};
use common::{date, Fixture};

fn notification(fx: &Fixture, title: &str) -> NewNotification {
    NewNotification {
        user_id: fx.user.user_id,
        title: title.to_string(),
        message: "Check your schedule".to_string(),
        kind: "reminder".to_string(),
        category: "general".to_string(),
        priority: NotificationPriority::High,
    }
}

#[tokio::test]
async fn email_follows_the_user_preference() {
    let fx = Fixture::new().await;
    let notifier = Notifier::new(fx.store.clone(), fx.mailer.clone());

    notifier.notify(notification(&fx, "First")).await.unwrap();
    fx.store
        .set_email_notifications(fx.user.user_id, false)
        .await
        .unwrap();
    notifier.notify(notification(&fx, "Second")).await.unwrap();

    let sent = fx.mailer.sent.lock().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "student@example.com");
    assert_eq!(sent[0].1, "First");
    drop(sent);

    let stored = fx.store.list_notifications(fx.user.user_id, true).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].title, "Second");
}

#[tokio::test]
async fn weekly_digest_tallies_each_subject() {
    let fx = Fixture::new().await;
    let physics = fx.subject("Physics").await;
    let records = [
        (date(2024, 3, 4), AttendanceStatus::Present),
        (date(2024, 3, 6), AttendanceStatus::Absent),
        (date(2024, 3, 8), AttendanceStatus::Present),
        (date(2024, 2, 26), AttendanceStatus::Present),
    ]
    .into_iter()
    .map(|(day, status)| DayRecord {
        subject_id: physics.id,
        date: day,
        status,
        class_type: "Lecture".to_string(),
        schedule_class_id: None,
        time_duration: None,
        preparatory: false,
    })
    .collect();
    fx.auto.upload_day_records(fx.user.user_id, records).await.unwrap();

    let digest = build_digest(fx.store.as_ref(), fx.user.user_id, DigestPeriod::Weekly, date(2024, 3, 11))
        .await
        .unwrap();
    let tally = &digest.subjects["Physics"];
    assert_eq!((tally.present, tally.absent), (2, 1));
    assert_eq!(digest.unread_titles, vec!["Attendance uploaded".to_string()]);

    let sent = send_digests(
        fx.store.as_ref(),
        fx.mailer.as_ref(),
        DigestPeriod::Weekly,
        date(2024, 3, 11),
    )
    .await
    .unwrap();
    assert_eq!(sent, 1);
    let mails = fx.mailer.sent.lock().await;
    let digest_mail = mails.last().unwrap();
    assert!(digest_mail.1.starts_with("Weekly attendance digest"));
    assert!(digest_mail.2.contains("- Physics: 2 present, 1 absent"));
}

#[tokio::test]
async fn digests_skip_users_without_email() {
    let fx = Fixture::new().await;
    fx.store
        .set_email_notifications(fx.user.user_id, false)
        .await
        .unwrap();
    let sent = send_digests(
        fx.store.as_ref(),
        fx.mailer.as_ref(),
        DigestPeriod::Daily,
        date(2024, 3, 11),
    )
    .await
    .unwrap();
    assert_eq!(sent, 0);
    assert!(fx.mailer.sent.lock().await.is_empty());
}
