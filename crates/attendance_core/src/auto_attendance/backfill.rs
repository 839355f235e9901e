use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::AutoAttendance;
use crate::calendar::{days_inclusive, weekday_name};
use crate::domain::{AttendanceRecord, AttendanceStatus, NewAttendance, Schedule};
use crate::ports::{PortError, PortResult};

/// The result of one backfill run. An empty `created` list with a message is
/// the normal answer when there is nothing to mark.
#[derive(Debug, Clone)]
pub struct BackfillOutcome {
    pub created: Vec<AttendanceRecord>,
    pub message: String,
    /// First and last date that received a record.
    pub range: Option<(NaiveDate, NaiveDate)>,
}

impl BackfillOutcome {
    fn nothing(message: impl Into<String>) -> Self {
        Self {
            created: Vec::new(),
            message: message.into(),
            range: None,
        }
    }
}

impl AutoAttendance {
    /// Marks every fully elapsed class between the schedule's start date and
    /// `now` as present, skipping holidays, off-days and existing records.
    pub async fn mark_past_classes(
        &self,
        user_id: Uuid,
        now: NaiveDateTime,
    ) -> PortResult<BackfillOutcome> {
        let today = now.date();

        let Some(schedule) = self.db.latest_schedule(user_id).await? else {
            info!("User {} has no schedule; nothing to backfill", user_id);
            return Ok(BackfillOutcome::nothing(
                "No schedule found for the current semester",
            ));
        };
        if schedule.classes.is_empty() {
            return Ok(BackfillOutcome::nothing("The current schedule has no classes"));
        }

        let Some(start) = self.resolve_start(user_id, &schedule, today).await? else {
            info!("Academic period for user {} has ended", user_id);
            return Ok(BackfillOutcome::nothing(
                "The academic period is no longer active",
            ));
        };
        if start > today {
            return Ok(BackfillOutcome::nothing("The schedule has not started yet"));
        }

        let holidays: HashSet<NaiveDate> = self
            .db
            .list_holidays(user_id, None)
            .await?
            .into_iter()
            .map(|h| h.date)
            .collect();
        let off_days: HashSet<_> = schedule.off_days.iter().copied().collect();

        // Subject lookups are cached per run; a failed lookup skips that subject's classes.
        let mut known_subjects: HashMap<Uuid, bool> = HashMap::new();
        let mut created = Vec::new();

        for date in days_inclusive(start, today) {
            let weekday = date.weekday();
            if holidays.contains(&date) || off_days.contains(&weekday) {
                continue;
            }

            for class in schedule.classes_on(weekday) {
                if date == today && class.end_time > now.time() {
                    debug!("{} on {} has not finished yet", class.subject_name, date);
                    continue;
                }

                let subject_ok = match known_subjects.get(&class.subject_id) {
                    Some(ok) => *ok,
                    None => {
                        let ok = match self.db.get_subject(user_id, class.subject_id).await {
                            Ok(_) => true,
                            Err(e) => {
                                warn!(
                                    "Skipping {} ({}): subject lookup failed: {}",
                                    class.subject_name, class.subject_id, e
                                );
                                false
                            }
                        };
                        known_subjects.insert(class.subject_id, ok);
                        ok
                    }
                };
                if !subject_ok {
                    continue;
                }

                let record = NewAttendance {
                    user_id,
                    subject_id: class.subject_id,
                    date,
                    status: AttendanceStatus::Present,
                    class_type: class.class_type.clone(),
                    schedule_class_id: Some(class.id),
                    is_auto_marked: true,
                    time_duration: Some(class.time_duration()),
                };
                match self.db.record_attendance(record).await {
                    Ok(Some(saved)) => created.push(saved),
                    Ok(None) => {}
                    Err(e) => warn!(
                        "Failed to mark {} on {} ({}): {}",
                        class.subject_name,
                        date,
                        weekday_name(weekday),
                        e
                    ),
                }
            }
        }

        if created.is_empty() {
            return Ok(BackfillOutcome::nothing("All past classes are already marked"));
        }

        let first = created.iter().map(|r| r.date).min().unwrap_or(start);
        let last = created.iter().map(|r| r.date).max().unwrap_or(today);
        let message = format!(
            "Marked {} past class{} as present between {} and {}.",
            created.len(),
            if created.len() == 1 { "" } else { "es" },
            first,
            last
        );
        info!("User {}: {}", user_id, message);

        if let Err(e) = self
            .notifier
            .notify_attendance(user_id, "Attendance auto-marked", message.clone())
            .await
        {
            warn!("Failed to send backfill notification to {}: {}", user_id, e);
        }

        Ok(BackfillOutcome {
            created,
            message,
            range: Some((first, last)),
        })
    }

    /// `None` means the linked academic period has already ended.
    async fn resolve_start(
        &self,
        user_id: Uuid,
        schedule: &Schedule,
        today: NaiveDate,
    ) -> PortResult<Option<NaiveDate>> {
        // `now` is local wall-clock time, so the creation date must be too.
        let fallback = date_on(schedule.created_at, &Local);
        let Some(period_id) = schedule.academic_period_id else {
            return Ok(Some(fallback));
        };

        match self.db.get_academic_period(user_id, period_id).await {
            Ok(period) if period.has_ended(today) => Ok(None),
            Ok(period) => Ok(Some(period.start_date)),
            Err(PortError::NotFound(_)) => {
                warn!(
                    "Schedule {} links missing academic period {}; starting from creation date",
                    schedule.id, period_id
                );
                Ok(Some(fallback))
            }
            Err(e) => Err(e),
        }
    }
}

/// Calendar date of `instant` on the given clock.
fn date_on<Tz: TimeZone>(instant: DateTime<Utc>, clock: &Tz) -> NaiveDate {
    instant.with_timezone(clock).date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    #[test]
    fn creation_dates_follow_the_local_clock() {
        let late_evening_utc = Utc.with_ymd_and_hms(2024, 3, 10, 22, 30, 0).unwrap();
        let kolkata = FixedOffset::east_opt(5 * 3600 + 1800).unwrap();
        let new_york = FixedOffset::west_opt(4 * 3600).unwrap();

        assert_eq!(date_on(late_evening_utc, &Utc), NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
        assert_eq!(date_on(late_evening_utc, &kolkata), NaiveDate::from_ymd_opt(2024, 3, 11).unwrap());

        let early_morning_utc = Utc.with_ymd_and_hms(2024, 3, 12, 1, 0, 0).unwrap();
        assert_eq!(date_on(early_morning_utc, &new_york), NaiveDate::from_ymd_opt(2024, 3, 11).unwrap());
    }
}
