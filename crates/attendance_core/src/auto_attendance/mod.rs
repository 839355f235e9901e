//! crates/attendance_core/src/auto_attendance/mod.rs
//!
//! Automatic attendance marking: the past-class backfill and the end-of-day
//! bulk upload. Both write through `DatabaseService::record_attendance`, which
//! only inserts when no record exists for the same slot, so re-running either
//! operation never duplicates or overwrites a record.

mod backfill;
mod bulk_upload;

use std::sync::Arc;

use crate::notifier::Notifier;
use crate::ports::DatabaseService;

pub use backfill::BackfillOutcome;
pub use bulk_upload::DayRecord;

/// Name of the subject that collects records tagged as preparatory.
pub const PREPARATORY_SUBJECT: &str = "Preparatory";

#[derive(Clone)]
pub struct AutoAttendance {
    db: Arc<dyn DatabaseService>,
    notifier: Notifier,
}

impl AutoAttendance {
    pub fn new(db: Arc<dyn DatabaseService>, notifier: Notifier) -> Self {
        Self { db, notifier }
    }
}
