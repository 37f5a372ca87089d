//! Queue state machine, outcome classification, backoff and interval policy

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of one queued operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Pending,
    Retrying,
    Synced,
    Conflict,
    NeedsReview,
    Failed,
    Resolved,
    Ignored,
}

impl OperationStatus {
    /// Statuses the sync pass will attempt to send
    pub const fn is_replayable(&self) -> bool {
        matches!(
            self,
            OperationStatus::Pending | OperationStatus::Retrying | OperationStatus::Failed
        )
    }
}

/// One persisted mutating request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedOperation {
    pub id: Uuid,
    pub url: String,
    pub method: String,
    pub data: serde_json::Value,
    pub headers: Vec<(String, String)>,
    pub idempotency_key: String,
    /// Enqueue time, epoch millis
    pub created_at: i64,
    pub retries: u32,
    pub last_attempt_at: Option<i64>,
    pub status: OperationStatus,
    pub last_error: Option<String>,
    pub admin_note: Option<String>,
}

/// One row in the outcome history ring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub op_id: Uuid,
    pub url: String,
    pub method: String,
    pub status: OperationStatus,
    pub error: Option<String>,
    pub note: Option<String>,
    pub at: i64,
}

/// Measured connection quality; drives the periodic sync interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionQuality {
    Slow2g,
    TwoG,
    Regular,
}

/// What one replay attempt produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayOutcome {
    /// 2xx
    Synced,
    /// 409: stock violation or stale data, held for admin resolution
    Conflict,
    /// 4xx other than 409
    ClientError,
    /// 5xx
    ServerError,
    /// Connection/transport failure
    NetworkError,
}

/// Retries after which a 4xx-failing operation is surfaced for review.
pub const MAX_RETRIES: u32 = 5;

/// Classify an HTTP status line into a replay outcome.
pub fn classify_status(status: u16) -> ReplayOutcome {
    match status {
        200..=299 => ReplayOutcome::Synced,
        409 => ReplayOutcome::Conflict,
        400..=499 => ReplayOutcome::ClientError,
        _ => ReplayOutcome::ServerError,
    }
}

/// The status an operation transitions to after an attempt, given its new
/// retry count.
pub fn next_status(outcome: ReplayOutcome, retries: u32, max_retries: u32) -> OperationStatus {
    match outcome {
        ReplayOutcome::Synced => OperationStatus::Synced,
        ReplayOutcome::Conflict => OperationStatus::Conflict,
        ReplayOutcome::ClientError => {
            if retries >= max_retries {
                OperationStatus::NeedsReview
            } else {
                OperationStatus::Failed
            }
        }
        ReplayOutcome::ServerError | ReplayOutcome::NetworkError => {
            if retries >= max_retries {
                OperationStatus::Failed
            } else {
                OperationStatus::Retrying
            }
        }
    }
}

/// Exponential backoff with jitter: base 1 s, factor 2, cap 60 s, ±25 %.
///
/// `jitter` is in `[-0.25, 0.25]`; the caller draws it so tests can pin it.
pub fn backoff_delay_ms(retries: u32, jitter: f64) -> u64 {
    const BASE_MS: u64 = 1_000;
    const CAP_MS: u64 = 60_000;
    let exp = BASE_MS.saturating_mul(2u64.saturating_pow(retries)).min(CAP_MS);
    let jittered = exp as f64 * (1.0 + jitter.clamp(-0.25, 0.25));
    jittered.max(0.0) as u64
}

/// Periodic sync interval, adapted to queue state and connection quality.
pub fn sync_interval(
    quality: ConnectionQuality,
    pending: usize,
    failed: usize,
) -> std::time::Duration {
    let secs = match quality {
        ConnectionQuality::Slow2g | ConnectionQuality::TwoG => 25,
        ConnectionQuality::Regular if pending > 0 || failed > 0 => 5,
        ConnectionQuality::Regular => 10,
    };
    std::time::Duration::from_secs(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify_status(200), ReplayOutcome::Synced);
        assert_eq!(classify_status(201), ReplayOutcome::Synced);
        assert_eq!(classify_status(409), ReplayOutcome::Conflict);
        assert_eq!(classify_status(400), ReplayOutcome::ClientError);
        assert_eq!(classify_status(404), ReplayOutcome::ClientError);
        assert_eq!(classify_status(500), ReplayOutcome::ServerError);
        assert_eq!(classify_status(503), ReplayOutcome::ServerError);
    }

    #[test]
    fn test_transitions() {
        assert_eq!(
            next_status(ReplayOutcome::Synced, 0, MAX_RETRIES),
            OperationStatus::Synced
        );
        assert_eq!(
            next_status(ReplayOutcome::Conflict, 0, MAX_RETRIES),
            OperationStatus::Conflict
        );
        // 4xx fails, then surfaces for review after the retry budget
        assert_eq!(
            next_status(ReplayOutcome::ClientError, 1, MAX_RETRIES),
            OperationStatus::Failed
        );
        assert_eq!(
            next_status(ReplayOutcome::ClientError, 5, MAX_RETRIES),
            OperationStatus::NeedsReview
        );
        // 5xx retries with backoff, then parks as failed
        assert_eq!(
            next_status(ReplayOutcome::ServerError, 1, MAX_RETRIES),
            OperationStatus::Retrying
        );
        assert_eq!(
            next_status(ReplayOutcome::ServerError, 5, MAX_RETRIES),
            OperationStatus::Failed
        );
        assert_eq!(
            next_status(ReplayOutcome::NetworkError, 2, MAX_RETRIES),
            OperationStatus::Retrying
        );
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        assert_eq!(backoff_delay_ms(0, 0.0), 1_000);
        assert_eq!(backoff_delay_ms(1, 0.0), 2_000);
        assert_eq!(backoff_delay_ms(2, 0.0), 4_000);
        assert_eq!(backoff_delay_ms(5, 0.0), 32_000);
        assert_eq!(backoff_delay_ms(6, 0.0), 60_000);
        assert_eq!(backoff_delay_ms(30, 0.0), 60_000);
    }

    #[test]
    fn test_backoff_jitter_bounds() {
        assert_eq!(backoff_delay_ms(0, 0.25), 1_250);
        assert_eq!(backoff_delay_ms(0, -0.25), 750);
        // Out-of-range jitter is clamped
        assert_eq!(backoff_delay_ms(0, 5.0), 1_250);
    }

    #[test]
    fn test_interval_table() {
        use std::time::Duration;
        assert_eq!(
            sync_interval(ConnectionQuality::Slow2g, 0, 0),
            Duration::from_secs(25)
        );
        assert_eq!(
            sync_interval(ConnectionQuality::TwoG, 10, 0),
            Duration::from_secs(25)
        );
        assert_eq!(
            sync_interval(ConnectionQuality::Regular, 1, 0),
            Duration::from_secs(5)
        );
        assert_eq!(
            sync_interval(ConnectionQuality::Regular, 0, 2),
            Duration::from_secs(5)
        );
        assert_eq!(
            sync_interval(ConnectionQuality::Regular, 0, 0),
            Duration::from_secs(10)
        );
    }

    #[test]
    fn test_replayable_statuses() {
        assert!(OperationStatus::Pending.is_replayable());
        assert!(OperationStatus::Retrying.is_replayable());
        assert!(OperationStatus::Failed.is_replayable());
        assert!(!OperationStatus::Conflict.is_replayable());
        assert!(!OperationStatus::NeedsReview.is_replayable());
        assert!(!OperationStatus::Ignored.is_replayable());
    }
}
