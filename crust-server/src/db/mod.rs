//! Database access layer
//!
//! One module per aggregate, plus the shared transaction/locking substrate.
//! All mutating handlers run inside a single transaction obtained from
//! [`begin_with_retry`]; correctness relies on row-level locks taken by the
//! ledger and on unique constraints (idempotency key, receipt number).

pub mod actors;
pub mod archive;
pub mod batches;
pub mod branches;
pub mod expenses;
pub mod idempotency;
pub mod kpi;
pub mod ledger;
pub mod notifications;
pub mod payments;
pub mod products;
pub mod sales;
pub mod staff;

use sqlx::{PgPool, Postgres, Transaction};
use std::time::Duration;

use crate::error::ServiceResult;

/// Enumerated advisory-lock key namespace. Keys are process-coordination
/// primitives held at the database; allocate new ones here only.
pub mod lock_keys {
    /// Guards both the scheduled archival runner and manual archive runs.
    pub const ARCHIVE_SCHEDULER: i64 = 0x6372_7573_7401;
}

/// Bound on `BEGIN` retries for transient connection failures.
const BEGIN_MAX_ATTEMPTS: u32 = 3;

/// Classify an sqlx error as transient: connection termination and timeout
/// conditions that a client may retry with backoff.
pub fn is_transient_db_error(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => true,
        sqlx::Error::Database(db_err) => {
            // Class 08 = connection exceptions; 57P0x = server shutdown;
            // 57014 = statement timeout / cancellation.
            let transient_code = db_err
                .code()
                .map(|c| c.starts_with("08") || c.starts_with("57P") || c == "57014")
                .unwrap_or(false);
            transient_code || db_err.message().contains("Connection terminated")
        }
        other => other.to_string().contains("Connection terminated"),
    }
}

/// Begin a transaction, retrying transient failures a bounded number of
/// times with jitter. Transient failures mid-transaction are not retried
/// here; they surface as `DB_TRANSIENT` to the caller.
pub async fn begin_with_retry(pool: &PgPool) -> ServiceResult<Transaction<'static, Postgres>> {
    let mut attempt = 0u32;
    loop {
        match pool.begin().await {
            Ok(tx) => return Ok(tx),
            Err(e) if is_transient_db_error(&e) && attempt + 1 < BEGIN_MAX_ATTEMPTS => {
                attempt += 1;
                let jitter = {
                    use rand::Rng;
                    rand::thread_rng().gen_range(0..250)
                };
                let delay = Duration::from_millis(100 * attempt as u64 + jitter);
                tracing::warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Transient failure on BEGIN, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Commit a transaction, folding the sqlx error into the service error
/// space so handlers can use `?`.
pub async fn commit(tx: Transaction<'static, Postgres>) -> ServiceResult<()> {
    Ok(tx.commit().await?)
}

/// Try to take a session-scoped advisory lock on the given key.
///
/// The lock lives on the connection, so callers must hold the same
/// connection until [`advisory_unlock`].
pub async fn try_advisory_lock(
    conn: &mut sqlx::PgConnection,
    key: i64,
) -> ServiceResult<bool> {
    let (acquired,): (bool,) = sqlx::query_as("SELECT pg_try_advisory_lock($1)")
        .bind(key)
        .fetch_one(&mut *conn)
        .await?;
    Ok(acquired)
}

/// Release an advisory lock taken with [`try_advisory_lock`].
pub async fn advisory_unlock(conn: &mut sqlx::PgConnection, key: i64) -> ServiceResult<()> {
    sqlx::query("SELECT pg_advisory_unlock($1)")
        .bind(key)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_errors_are_transient() {
        assert!(is_transient_db_error(&sqlx::Error::PoolTimedOut));
        assert!(is_transient_db_error(&sqlx::Error::PoolClosed));
        assert!(is_transient_db_error(&sqlx::Error::Io(
            std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")
        )));
    }

    #[test]
    fn test_logic_errors_are_not_transient() {
        assert!(!is_transient_db_error(&sqlx::Error::RowNotFound));
        assert!(!is_transient_db_error(&sqlx::Error::ColumnNotFound(
            "missing".into()
        )));
    }
}
