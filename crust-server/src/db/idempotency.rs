//! Idempotency gate
//!
//! Every mutating command passes through [`admit`] inside its transaction.
//! The `INSERT .. ON CONFLICT DO NOTHING RETURNING id` is the admission
//! token: exactly one caller per `(actor, key)` wins the insert and executes
//! the handler body; everyone else replays the stored response verbatim. If
//! the handler fails before commit, the rollback releases the key and a
//! retry may succeed.

use shared::error::{AppError, ErrorCode};
use shared::headers::IDEMPOTENCY_KEY_MAX_LEN;
use sqlx::{Postgres, Transaction};

use crate::error::ServiceResult;

/// Outcome of the admission check
#[derive(Debug)]
pub enum Admission {
    /// First execution for this `(actor, key)`; proceed and store the
    /// response against the returned key id before commit.
    Admitted { key_id: i64 },
    /// Key already consumed by a completed request; return this payload
    /// without touching aggregates.
    Replayed(serde_json::Value),
}

/// Run the admission check for `(actor_id, key)` against `endpoint`.
pub async fn admit(
    tx: &mut Transaction<'_, Postgres>,
    actor_id: i64,
    key: &str,
    endpoint: &str,
) -> ServiceResult<Admission> {
    if key.is_empty() || key.len() > IDEMPOTENCY_KEY_MAX_LEN {
        return Err(AppError::new(ErrorCode::IdempotencyKeyTooLong)
            .with_detail("length", key.len())
            .into());
    }

    let inserted: Option<(i64,)> = sqlx::query_as(
        r#"
        INSERT INTO idempotency_keys (actor_id, key, endpoint)
        VALUES ($1, $2, $3)
        ON CONFLICT (actor_id, key) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(actor_id)
    .bind(key)
    .bind(endpoint)
    .fetch_optional(&mut **tx)
    .await?;

    if let Some((key_id,)) = inserted {
        return Ok(Admission::Admitted { key_id });
    }

    // Lost the insert race or replaying an earlier request: load the
    // stored row. The row is visible because the winning transaction has
    // committed; an uncommitted winner would have blocked our insert until
    // it resolved.
    let existing: Option<(String, Option<serde_json::Value>)> = sqlx::query_as(
        "SELECT endpoint, response_payload FROM idempotency_keys WHERE actor_id = $1 AND key = $2",
    )
    .bind(actor_id)
    .bind(key)
    .fetch_optional(&mut **tx)
    .await?;

    let Some((stored_endpoint, payload)) = existing else {
        // Winner rolled back between our insert and select; treat as
        // transient so the client retries with the same key.
        return Err(AppError::db_transient().into());
    };

    if stored_endpoint != endpoint {
        return Err(AppError::new(ErrorCode::IdempotencyEndpointMismatch)
            .with_detail("stored_endpoint", stored_endpoint)
            .with_detail("endpoint", endpoint)
            .into());
    }

    match payload {
        Some(payload) => Ok(Admission::Replayed(payload)),
        // Key row exists but the response was never stored: the winning
        // request is still in flight on another connection.
        None => Err(AppError::db_transient().into()),
    }
}

/// Persist the successful response against the admitted key, inside the
/// same transaction that produced it.
pub async fn store_response(
    tx: &mut Transaction<'_, Postgres>,
    key_id: i64,
    payload: &serde_json::Value,
) -> ServiceResult<()> {
    sqlx::query("UPDATE idempotency_keys SET response_payload = $1 WHERE id = $2")
        .bind(payload)
        .bind(key_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
