//! services/api/src/adapters/mailer.rs
//!
//! The outgoing mail adapter. Messages are written to the log; a transport
//! can replace it behind the same `Mailer` port.

use async_trait::async_trait;
use attendance_core::ports::{Mailer, PortResult};
use tracing::info;

#[derive(Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> PortResult<()> {
        info!(to, subject, body_len = body.len(), "Outgoing email");
        Ok(())
    }
}
