//! services/api/src/jobs.rs
//!
//! Work the server does on a timer rather than per request: the
//! auto-attendance sweep and the notification digests.

use attendance_core::digest::{send_digests, DigestPeriod};
use chrono::Local;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::web::state::AppState;

const WEEK: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Starts every periodic job. They stop when `token` is cancelled.
pub fn spawn_jobs(state: Arc<AppState>, token: CancellationToken) -> Vec<JoinHandle<()>> {
    vec![
        tokio::spawn(run_periodically(
            "auto-attendance sweep",
            state.clone(),
            sweep_auto_attendance,
            state.config.auto_attendance_interval,
            token.clone(),
        )),
        tokio::spawn(run_periodically(
            "daily digest",
            state.clone(),
            |state| send_digest(state, DigestPeriod::Daily),
            state.config.digest_interval,
            token.clone(),
        )),
        tokio::spawn(run_periodically(
            "weekly digest",
            state,
            |state| send_digest(state, DigestPeriod::Weekly),
            WEEK,
            token,
        )),
    ]
}

/// Calls `task` every `frequency` until the token is cancelled. The first,
/// immediate tick is skipped.
async fn run_periodically<F, Fut>(
    name: &'static str,
    state: Arc<AppState>,
    task: F,
    frequency: Duration,
    token: CancellationToken,
) where
    F: Fn(Arc<AppState>) -> Fut,
    Fut: Future<Output = ()>,
{
    let mut interval = interval(frequency);
    interval.tick().await;
    loop {
        tokio::select! {
            _ = token.cancelled() => {
                info!("Stopping {}", name);
                return;
            }
            _ = interval.tick() => task(state.clone()).await,
        }
    }
}

/// Backfills attendance for every user who has the feature switched on.
pub async fn sweep_auto_attendance(state: Arc<AppState>) {
    let users = match state.db.list_auto_attendance_users().await {
        Ok(users) => users,
        Err(e) => {
            error!("Auto-attendance sweep could not list users: {}", e);
            return;
        }
    };

    let now = Local::now().naive_local();
    let mut created = 0;
    for user in users {
        match state
            .auto_attendance
            .mark_past_classes(user.user_id, now)
            .await
        {
            Ok(outcome) => created += outcome.created.len(),
            Err(e) => error!("Auto-attendance failed for user {}: {}", user.user_id, e),
        }
    }
    info!("Auto-attendance sweep created {} records", created);
}

async fn send_digest(state: Arc<AppState>, period: DigestPeriod) {
    let today = Local::now().date_naive();
    match send_digests(state.db.as_ref(), state.mailer.as_ref(), period, today).await {
        Ok(sent) => info!("Sent {} {:?} digests", sent, period),
        Err(e) => error!("{:?} digest run failed: {}", period, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{DisabledChatAdapter, LogMailer};
    use crate::config::Config;
    use attendance_core::InMemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn periodic_job_stops_on_cancel() {
        let state = Arc::new(AppState::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(LogMailer),
            Arc::new(DisabledChatAdapter),
            Arc::new(Config::default()),
        ));
        let runs = Arc::new(AtomicUsize::new(0));
        let token = CancellationToken::new();

        let counter = runs.clone();
        let handle = tokio::spawn(run_periodically(
            "counter",
            state,
            move |_| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            },
            Duration::from_secs(60),
            token.clone(),
        ));

        tokio::time::sleep(Duration::from_secs(150)).await;
        token.cancel();
        handle.await.unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }
}
