//! crates/attendance_core/src/digest.rs
//!
//! Daily and weekly attendance digests for users who receive email.

use std::collections::{BTreeMap, HashMap};

use chrono::{Duration, NaiveDate};
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{AttendanceFilter, AttendanceStatus, User};
use crate::ports::{DatabaseService, Mailer, PortResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestPeriod {
    Daily,
    Weekly,
}

impl DigestPeriod {
    /// The inclusive date window a digest sent on `today` covers.
    pub fn window(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let end = today - Duration::days(1);
        match self {
            DigestPeriod::Daily => (end, end),
            DigestPeriod::Weekly => (today - Duration::days(7), end),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            DigestPeriod::Daily => "Daily",
            DigestPeriod::Weekly => "Weekly",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectTally {
    pub present: u32,
    pub absent: u32,
}

#[derive(Debug, Clone)]
pub struct Digest {
    pub period: DigestPeriod,
    pub from: NaiveDate,
    pub to: NaiveDate,
    /// Keyed by subject name.
    pub subjects: BTreeMap<String, SubjectTally>,
    pub unread_titles: Vec<String>,
}

impl Digest {
    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty() && self.unread_titles.is_empty()
    }

    pub fn subject_line(&self) -> String {
        format!("{} attendance digest ({} to {})", self.period.label(), self.from, self.to)
    }

    pub fn body(&self) -> String {
        let mut body = String::new();
        if self.subjects.is_empty() {
            body.push_str("No classes were recorded in this period.\n");
        } else {
            body.push_str("Attendance:\n");
            for (name, tally) in &self.subjects {
                body.push_str(&format!(
                    "- {}: {} present, {} absent\n",
                    name, tally.present, tally.absent
                ));
            }
        }
        if !self.unread_titles.is_empty() {
            body.push_str(&format!("\nUnread notifications ({}):\n", self.unread_titles.len()));
            for title in &self.unread_titles {
                body.push_str(&format!("- {}\n", title));
            }
        }
        body
    }
}

pub async fn build_digest(
    db: &dyn DatabaseService,
    user_id: Uuid,
    period: DigestPeriod,
    today: NaiveDate,
) -> PortResult<Digest> {
    let (from, to) = period.window(today);
    let records = db
        .list_attendance(
            user_id,
            AttendanceFilter {
                from: Some(from),
                to: Some(to),
                subject_id: None,
            },
        )
        .await?;

    let names: HashMap<Uuid, String> = db
        .list_subjects(user_id)
        .await?
        .into_iter()
        .map(|s| (s.id, s.name))
        .collect();

    let mut subjects: BTreeMap<String, SubjectTally> = BTreeMap::new();
    for record in records {
        let name = names
            .get(&record.subject_id)
            .cloned()
            .unwrap_or_else(|| "Unknown subject".to_string());
        let tally = subjects.entry(name).or_default();
        match record.status {
            AttendanceStatus::Present => tally.present += 1,
            AttendanceStatus::Absent => tally.absent += 1,
        }
    }

    let unread_titles = db
        .list_notifications(user_id, true)
        .await?
        .into_iter()
        .map(|n| n.title)
        .collect();

    Ok(Digest {
        period,
        from,
        to,
        subjects,
        unread_titles,
    })
}

/// Builds and mails a digest to every user with email notifications on.
/// Returns how many digests were sent; per-user failures are logged and skipped.
pub async fn send_digests(
    db: &dyn DatabaseService,
    mailer: &dyn Mailer,
    period: DigestPeriod,
    today: NaiveDate,
) -> PortResult<usize> {
    let users: Vec<User> = db.list_email_subscribers().await?;
    let mut sent = 0;
    for user in users {
        let digest = match build_digest(db, user.user_id, period, today).await {
            Ok(digest) => digest,
            Err(e) => {
                warn!("Failed to build digest for {}: {}", user.user_id, e);
                continue;
            }
        };
        if digest.is_empty() {
            continue;
        }
        match mailer
            .send_email(&user.email, &digest.subject_line(), &digest.body())
            .await
        {
            Ok(()) => sent += 1,
            Err(e) => warn!("Failed to send digest to {}: {}", user.email, e),
        }
    }
    info!("Sent {} {} digests", sent, period.label().to_lowercase());
    Ok(sent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_end_yesterday() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 11).unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        assert_eq!(DigestPeriod::Daily.window(today), (yesterday, yesterday));
        assert_eq!(
            DigestPeriod::Weekly.window(today),
            (NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(), yesterday)
        );
    }

    #[test]
    fn body_lists_subjects_and_unread() {
        let mut subjects = BTreeMap::new();
        subjects.insert("Physics".to_string(), SubjectTally { present: 3, absent: 1 });
        let digest = Digest {
            period: DigestPeriod::Weekly,
            from: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            to: NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
            subjects,
            unread_titles: vec!["Attendance auto-marked".to_string()],
        };
        let body = digest.body();
        assert!(body.contains("- Physics: 3 present, 1 absent"));
        assert!(body.contains("Unread notifications (1)"));
        assert!(digest.subject_line().starts_with("Weekly"));
    }
}
