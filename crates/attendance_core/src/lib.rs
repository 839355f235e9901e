pub mod auto_attendance;
pub mod calendar;
pub mod digest;
pub mod domain;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod notifier;
pub mod ports;
pub mod schedule_parser;

pub use auto_attendance::{AutoAttendance, BackfillOutcome, DayRecord};
pub use domain::{
    AcademicPeriod, AttendanceFilter, AttendanceRecord, AttendanceStatus, ClassCounter, ClassType,
    Holiday, Notification, NotificationPriority, Schedule, ScheduledClass, Subject, Todo, User,
    UserCredentials,
};
#[cfg(any(test, feature = "test-util"))]
pub use memory::InMemoryStore;
pub use notifier::Notifier;
pub use ports::{ChatAssistantService, DatabaseService, Mailer, PortError, PortResult};
pub use schedule_parser::{
    PdfContent, ScheduleExtractor, ScheduleItem, ScheduleParseError, TextElement,
};
