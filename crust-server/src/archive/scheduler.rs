//! Archive scheduler
//!
//! Startup catch-up sweep, then a daily run aligned to local midnight.
//! Every six months a gentle reminder notification goes out per branch
//! regardless of whether archival is enabled there.

use chrono::{Duration as ChronoDuration, Local};
use tokio_util::sync::CancellationToken;

use super::engine;
use crate::db::{self, actors, archive as archive_db, notifications};
use crate::error::ServiceError;
use crate::state::AppState;

/// Days between reminder notifications (~6 months)
const REMINDER_INTERVAL_DAYS: i64 = 182;

pub struct Scheduler {
    state: AppState,
    shutdown: CancellationToken,
}

impl Scheduler {
    pub fn new(state: AppState, shutdown: CancellationToken) -> Self {
        Self { state, shutdown }
    }

    /// Run until shutdown: catch-up sweep on startup, then once per local
    /// midnight.
    pub async fn run(self) {
        tracing::info!("Archive scheduler started");

        self.tick().await;

        loop {
            let sleep_for = until_next_local_midnight();
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Archive scheduler shutting down");
                    break;
                }
                _ = tokio::time::sleep(sleep_for) => {
                    self.tick().await;
                }
            }
        }
    }

    async fn tick(&self) {
        if let Err(e) = engine::scheduled_sweep(&self.state.pool).await {
            let app: shared::error::AppError = e.into();
            tracing::error!(error = %app.message, "Scheduled archive sweep failed");
        }
        if let Err(e) = self.send_due_reminders().await {
            let app: shared::error::AppError = e.into();
            tracing::error!(error = %app.message, "Archive reminder pass failed");
        }
    }

    /// Remind branch admins about the archival feature twice a year, even
    /// where it is disabled.
    async fn send_due_reminders(&self) -> Result<(), ServiceError> {
        let all_settings = archive_db::settings_for_active_branches(&self.state.pool).await?;
        let now = chrono::Utc::now();

        for settings in all_settings {
            let due = match settings.last_reminder_at {
                None => true,
                Some(last) => now - last >= ChronoDuration::days(REMINDER_INTERVAL_DAYS),
            };
            if !due {
                continue;
            }

            let mut tx = db::begin_with_retry(&self.state.pool).await?;
            let admins = actors::branch_admins(&mut tx, settings.branch_id).await?;
            let message = if settings.enabled {
                format!(
                    "History older than {} months is archived automatically; review the archive settings if the window no longer fits.",
                    settings.retention_months
                )
            } else {
                "Archival is disabled for this branch; aged history stays in the hot tables until it is enabled.".to_string()
            };
            for admin in admins {
                notifications::insert(
                    &mut *tx,
                    admin,
                    settings.branch_id,
                    "Archive check-in",
                    &message,
                    "archive_reminder",
                )
                .await?;
            }
            tx.commit().await?;

            archive_db::touch_last_reminder(&self.state.pool, settings.branch_id).await?;
        }
        Ok(())
    }
}

/// Time until the next local midnight.
fn until_next_local_midnight() -> std::time::Duration {
    let now = Local::now();
    let tomorrow = (now + ChronoDuration::days(1)).date_naive();
    let next_midnight = tomorrow
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always a valid time");
    let until = next_midnight - now.naive_local();
    until.to_std().unwrap_or(std::time::Duration::from_secs(60))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_until_next_midnight_is_within_a_day() {
        let d = until_next_local_midnight();
        assert!(d <= std::time::Duration::from_secs(24 * 60 * 60));
        assert!(d > std::time::Duration::ZERO);
    }
}
