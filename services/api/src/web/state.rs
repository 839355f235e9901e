//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use attendance_core::ports::{ChatAssistantService, DatabaseService, Mailer};
use attendance_core::{AutoAttendance, Notifier, ScheduleExtractor};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    pub mailer: Arc<dyn Mailer>,
    pub notifier: Notifier,
    pub auto_attendance: AutoAttendance,
    pub extractor: Arc<ScheduleExtractor>,
    pub chat: Arc<dyn ChatAssistantService>,
}

impl AppState {
    /// Wires the core services on top of the given adapters.
    pub fn new(
        db: Arc<dyn DatabaseService>,
        mailer: Arc<dyn Mailer>,
        chat: Arc<dyn ChatAssistantService>,
        config: Arc<Config>,
    ) -> Self {
        let notifier = Notifier::new(db.clone(), mailer.clone());
        let auto_attendance = AutoAttendance::new(db.clone(), notifier.clone());
        Self {
            db,
            config,
            mailer,
            notifier,
            auto_attendance,
            extractor: Arc::new(ScheduleExtractor::default()),
            chat,
        }
    }
}
