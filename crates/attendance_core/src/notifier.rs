//! crates/attendance_core/src/notifier.rs
//!
//! Persists notifications and forwards them by email to users who opted in.

use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::{NewNotification, Notification, NotificationPriority};
use crate::ports::{DatabaseService, Mailer, PortResult};

/// Longest message stored on a notification.
pub const MAX_MESSAGE_LEN: usize = 1000;

#[derive(Clone)]
pub struct Notifier {
    db: Arc<dyn DatabaseService>,
    mailer: Arc<dyn Mailer>,
}

impl Notifier {
    pub fn new(db: Arc<dyn DatabaseService>, mailer: Arc<dyn Mailer>) -> Self {
        Self { db, mailer }
    }

    /// Saves the notification and emails it when the user has email enabled.
    /// Mail delivery failures are logged and never fail the call.
    pub async fn notify(&self, mut notification: NewNotification) -> PortResult<Notification> {
        notification.message = truncate_message(&notification.message);
        let saved = self.db.save_notification(notification).await?;

        match self.db.get_user(saved.user_id).await {
            Ok(user) if user.email_notifications => {
                if let Err(e) = self
                    .mailer
                    .send_email(&user.email, &saved.title, &saved.message)
                    .await
                {
                    warn!("Failed to email notification {}: {}", saved.id, e);
                }
            }
            Ok(_) => debug!("User {} has email notifications disabled", saved.user_id),
            Err(e) => warn!("Could not load user {} for email: {}", saved.user_id, e),
        }

        Ok(saved)
    }

    /// Shorthand for attendance notifications.
    pub async fn notify_attendance(
        &self,
        user_id: Uuid,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> PortResult<Notification> {
        self.notify(NewNotification {
            user_id,
            title: title.into(),
            message: message.into(),
            kind: "attendance".to_string(),
            category: "attendance".to_string(),
            priority: NotificationPriority::Normal,
        })
        .await
    }
}

fn truncate_message(message: &str) -> String {
    if message.chars().count() <= MAX_MESSAGE_LEN {
        return message.to_string();
    }
    let mut truncated: String = message.chars().take(MAX_MESSAGE_LEN - 1).collect();
    truncated.push('…');
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_messages_are_cut_to_the_limit() {
        let long = "x".repeat(MAX_MESSAGE_LEN + 50);
        let cut = truncate_message(&long);
        assert_eq!(cut.chars().count(), MAX_MESSAGE_LEN);
        assert!(cut.ends_with('…'));
        assert_eq!(truncate_message("short"), "short");
    }
}
