//! Production batch lifecycle
//!
//! Batches are the only producers of `batch_in` movements. Edits diff the
//! desired lines against the current lines and emit compensating movements;
//! voids reverse every surviving line with `void_out` so that the batch's
//! net effect on stock is zero.

use chrono::{DateTime, Duration, Utc};
use shared::error::{AppError, ErrorCode};
use shared::models::batch::{BatchCreate, BatchEdit, BatchItemInput, BatchWithItems};
use shared::models::{Batch, BatchItem, BatchStatus, MovementType, Role, StockSource};
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::BTreeMap;

use super::ledger::{self, Movement};
use crate::error::ServiceResult;

/// Who is asking to touch a batch
#[derive(Debug, Clone, Copy)]
pub struct BatchActor {
    pub actor_id: i64,
    pub role: Role,
}

/// Editability predicate (normative time-window variant): a batch is
/// editable/voidable iff it is not voided, the actor is its creator or an
/// admin, the role is manager or admin, and the batch is still inside the
/// edit window.
pub fn check_modifiable(
    batch: &Batch,
    actor: BatchActor,
    now: DateTime<Utc>,
    edit_window: Duration,
) -> Result<(), AppError> {
    if !matches!(actor.role, Role::Manager | Role::Admin) {
        return Err(AppError::forbidden("Only managers or admins can modify batches"));
    }
    if actor.actor_id != batch.creator_actor_id && actor.role != Role::Admin {
        return Err(AppError::forbidden("Only the creating manager or an admin can modify this batch"));
    }
    if batch.status == BatchStatus::Voided {
        return Err(AppError::new(ErrorCode::BatchVoided));
    }
    if now - batch.created_at > edit_window {
        return Err(AppError::new(ErrorCode::BatchLocked)
            .with_detail("created_at", batch.created_at.to_rfc3339())
            .with_detail("edit_window_minutes", edit_window.num_minutes()));
    }
    Ok(())
}

/// Reject duplicate `(product, source)` lines and non-positive quantities.
pub fn validate_items(items: &[BatchItemInput]) -> Result<(), AppError> {
    if items.is_empty() {
        return Err(AppError::validation("Batch needs at least one item"));
    }
    let mut seen: BTreeMap<(i64, StockSource), ()> = BTreeMap::new();
    for item in items {
        if item.quantity < 1 {
            return Err(AppError::validation("Batch item quantity must be at least 1")
                .with_detail("product_id", item.product_id));
        }
        if seen.insert((item.product_id, item.source), ()).is_some() {
            return Err(AppError::validation("Duplicate batch line for product and source")
                .with_detail("product_id", item.product_id));
        }
    }
    Ok(())
}

/// Attribution for offline-replayed batches
pub struct SyncAttribution {
    pub creator_actor_id: i64,
    pub synced_by_actor_id: Option<i64>,
}

/// Decide who the batch belongs to. Offline replays preserve the original
/// creator; the syncing actor is recorded separately.
pub fn resolve_attribution(
    submitting_actor_id: i64,
    is_offline: bool,
    original_actor_id: Option<i64>,
) -> SyncAttribution {
    match original_actor_id {
        Some(original) if is_offline && original != submitting_actor_id => SyncAttribution {
            creator_actor_id: original,
            synced_by_actor_id: Some(submitting_actor_id),
        },
        _ => SyncAttribution {
            creator_actor_id: submitting_actor_id,
            synced_by_actor_id: None,
        },
    }
}

/// Create a batch: insert header + lines, emit `batch_in` movements.
pub async fn create(
    tx: &mut Transaction<'_, Postgres>,
    branch_id: i64,
    submitting_actor_id: i64,
    payload: &BatchCreate,
) -> ServiceResult<BatchWithItems> {
    validate_items(&payload.items)?;

    let attribution = resolve_attribution(
        submitting_actor_id,
        payload.is_offline,
        payload.original_actor_id,
    );
    let status = if payload.is_offline {
        BatchStatus::Pending
    } else {
        BatchStatus::Sent
    };

    let batch: Batch = sqlx::query_as(
        r#"
        INSERT INTO batches
            (branch_id, creator_actor_id, status, notes, is_offline,
             synced_by_actor_id, synced_at)
        VALUES ($1, $2, $3, $4, $5, $6,
                CASE WHEN $6::bigint IS NULL THEN NULL ELSE now() END)
        RETURNING *
        "#,
    )
    .bind(branch_id)
    .bind(attribution.creator_actor_id)
    .bind(status)
    .bind(&payload.notes)
    .bind(payload.is_offline)
    .bind(attribution.synced_by_actor_id)
    .fetch_one(&mut **tx)
    .await?;

    let mut items = Vec::with_capacity(payload.items.len());
    for line in &payload.items {
        let item: BatchItem = sqlx::query_as(
            r#"
            INSERT INTO batch_items (batch_id, product_id, quantity, source)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(batch.id)
        .bind(line.product_id)
        .bind(line.quantity)
        .bind(line.source)
        .fetch_one(&mut **tx)
        .await?;
        items.push(item);
    }

    let movements: Vec<Movement> = payload
        .items
        .iter()
        .map(|line| Movement {
            branch_id,
            product_id: line.product_id,
            movement_type: MovementType::BatchIn,
            quantity_change: line.quantity,
            source: line.source,
            reference_type: "batch",
            reference_id: Some(batch.id),
            actor_id: attribution.creator_actor_id,
            metadata: None,
        })
        .collect();
    ledger::apply_movements(tx, &movements).await?;

    Ok(BatchWithItems { batch, items })
}

/// Compute the compensating line deltas for an edit: desired minus current,
/// keyed by `(product_id, source)`. Positive deltas are `batch_in`,
/// negative deltas `void_out`.
pub fn diff_items(
    current: &[BatchItem],
    desired: &[BatchItemInput],
) -> Vec<(i64, StockSource, i32)> {
    let mut deltas: BTreeMap<(i64, StockSource), i32> = BTreeMap::new();
    for item in current {
        *deltas.entry((item.product_id, item.source)).or_default() -= item.quantity;
    }
    for line in desired {
        *deltas.entry((line.product_id, line.source)).or_default() += line.quantity;
    }
    deltas
        .into_iter()
        .filter(|&(_, delta)| delta != 0)
        .map(|((product_id, source), delta)| (product_id, source, delta))
        .collect()
}

/// Edit a batch inside its window: replace the line set and emit
/// compensating movements for the difference.
pub async fn edit(
    tx: &mut Transaction<'_, Postgres>,
    batch: &Batch,
    actor_id: i64,
    payload: &BatchEdit,
) -> ServiceResult<BatchWithItems> {
    validate_items(&payload.items)?;

    let current = items_in_tx(tx, batch.id).await?;
    let deltas = diff_items(&current, &payload.items);

    let movements: Vec<Movement> = deltas
        .iter()
        .map(|&(product_id, source, delta)| Movement {
            branch_id: batch.branch_id,
            product_id,
            movement_type: if delta > 0 {
                MovementType::BatchIn
            } else {
                MovementType::VoidOut
            },
            quantity_change: delta,
            source,
            reference_type: "batch",
            reference_id: Some(batch.id),
            actor_id,
            metadata: None,
        })
        .collect();
    ledger::apply_movements(tx, &movements).await?;

    // Replace the line set with the desired one
    sqlx::query("DELETE FROM batch_items WHERE batch_id = $1")
        .bind(batch.id)
        .execute(&mut **tx)
        .await?;
    let mut items = Vec::with_capacity(payload.items.len());
    for line in &payload.items {
        let item: BatchItem = sqlx::query_as(
            r#"
            INSERT INTO batch_items (batch_id, product_id, quantity, source)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(batch.id)
        .bind(line.product_id)
        .bind(line.quantity)
        .bind(line.source)
        .fetch_one(&mut **tx)
        .await?;
        items.push(item);
    }

    let updated: Batch = sqlx::query_as(
        "UPDATE batches SET status = 'edited', notes = COALESCE($2, notes) WHERE id = $1 RETURNING *",
    )
    .bind(batch.id)
    .bind(&payload.notes)
    .fetch_one(&mut **tx)
    .await?;

    Ok(BatchWithItems {
        batch: updated,
        items,
    })
}

/// Void a batch: reverse every surviving line with an equal-magnitude
/// `void_out` movement.
pub async fn void(
    tx: &mut Transaction<'_, Postgres>,
    batch: &Batch,
    actor_id: i64,
) -> ServiceResult<Batch> {
    let items = items_in_tx(tx, batch.id).await?;

    let movements: Vec<Movement> = items
        .iter()
        .map(|item| Movement {
            branch_id: batch.branch_id,
            product_id: item.product_id,
            movement_type: MovementType::VoidOut,
            quantity_change: -item.quantity,
            source: item.source,
            reference_type: "batch",
            reference_id: Some(batch.id),
            actor_id,
            metadata: None,
        })
        .collect();
    ledger::apply_movements(tx, &movements).await?;

    let voided: Batch =
        sqlx::query_as("UPDATE batches SET status = 'voided' WHERE id = $1 RETURNING *")
            .bind(batch.id)
            .fetch_one(&mut **tx)
            .await?;
    Ok(voided)
}

/// Load a batch, locking the row against concurrent edit/void.
pub async fn get_for_update(
    tx: &mut Transaction<'_, Postgres>,
    batch_id: i64,
) -> ServiceResult<Batch> {
    let batch: Option<Batch> = sqlx::query_as("SELECT * FROM batches WHERE id = $1 FOR UPDATE")
        .bind(batch_id)
        .fetch_optional(&mut **tx)
        .await?;
    batch.ok_or_else(|| AppError::not_found("Batch").into())
}

async fn items_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    batch_id: i64,
) -> ServiceResult<Vec<BatchItem>> {
    Ok(
        sqlx::query_as("SELECT * FROM batch_items WHERE batch_id = $1 ORDER BY id")
            .bind(batch_id)
            .fetch_all(&mut **tx)
            .await?,
    )
}

/// List batches for a branch, newest first, with their items.
pub async fn list(pool: &PgPool, branch_id: i64, limit: i64) -> ServiceResult<Vec<BatchWithItems>> {
    let batches: Vec<Batch> = sqlx::query_as(
        "SELECT * FROM batches WHERE branch_id = $1 ORDER BY created_at DESC LIMIT $2",
    )
    .bind(branch_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    let mut result = Vec::with_capacity(batches.len());
    for batch in batches {
        let items: Vec<BatchItem> =
            sqlx::query_as("SELECT * FROM batch_items WHERE batch_id = $1 ORDER BY id")
                .bind(batch.id)
                .fetch_all(pool)
                .await?;
        result.push(BatchWithItems { batch, items });
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(status: BatchStatus, creator: i64, age_minutes: i64) -> Batch {
        Batch {
            id: 1,
            branch_id: 1,
            creator_actor_id: creator,
            batch_date: Utc::now(),
            status,
            notes: None,
            is_offline: false,
            synced_by_actor_id: None,
            synced_at: None,
            created_at: Utc::now() - Duration::minutes(age_minutes),
        }
    }

    fn item(product_id: i64, quantity: i32, source: StockSource) -> BatchItem {
        BatchItem {
            id: 0,
            batch_id: 1,
            product_id,
            quantity,
            source,
        }
    }

    fn input(product_id: i64, quantity: i32, source: StockSource) -> BatchItemInput {
        BatchItemInput {
            product_id,
            quantity,
            source,
        }
    }

    fn window() -> Duration {
        Duration::minutes(20)
    }

    #[test]
    fn test_creator_manager_within_window() {
        let b = batch(BatchStatus::Sent, 7, 10);
        let actor = BatchActor {
            actor_id: 7,
            role: Role::Manager,
        };
        assert!(check_modifiable(&b, actor, Utc::now(), window()).is_ok());
    }

    #[test]
    fn test_window_expired_is_locked() {
        let b = batch(BatchStatus::Sent, 7, 21);
        let actor = BatchActor {
            actor_id: 7,
            role: Role::Manager,
        };
        let err = check_modifiable(&b, actor, Utc::now(), window()).unwrap_err();
        assert_eq!(err.code, ErrorCode::BatchLocked);
    }

    #[test]
    fn test_admin_is_not_exempt_from_window() {
        let b = batch(BatchStatus::Sent, 7, 30);
        let actor = BatchActor {
            actor_id: 99,
            role: Role::Admin,
        };
        let err = check_modifiable(&b, actor, Utc::now(), window()).unwrap_err();
        assert_eq!(err.code, ErrorCode::BatchLocked);
    }

    #[test]
    fn test_non_creator_manager_forbidden() {
        let b = batch(BatchStatus::Sent, 7, 5);
        let actor = BatchActor {
            actor_id: 8,
            role: Role::Manager,
        };
        let err = check_modifiable(&b, actor, Utc::now(), window()).unwrap_err();
        assert_eq!(err.code, ErrorCode::AuthForbidden);
    }

    #[test]
    fn test_admin_may_modify_others_batches() {
        let b = batch(BatchStatus::Sent, 7, 5);
        let actor = BatchActor {
            actor_id: 99,
            role: Role::Admin,
        };
        assert!(check_modifiable(&b, actor, Utc::now(), window()).is_ok());
    }

    #[test]
    fn test_cashier_forbidden() {
        let b = batch(BatchStatus::Sent, 7, 5);
        let actor = BatchActor {
            actor_id: 7,
            role: Role::Cashier,
        };
        let err = check_modifiable(&b, actor, Utc::now(), window()).unwrap_err();
        assert_eq!(err.code, ErrorCode::AuthForbidden);
    }

    #[test]
    fn test_voided_batch_rejected() {
        let b = batch(BatchStatus::Voided, 7, 5);
        let actor = BatchActor {
            actor_id: 7,
            role: Role::Manager,
        };
        let err = check_modifiable(&b, actor, Utc::now(), window()).unwrap_err();
        assert_eq!(err.code, ErrorCode::BatchVoided);
    }

    #[test]
    fn test_validate_rejects_duplicates_and_zero() {
        assert!(validate_items(&[]).is_err());
        assert!(validate_items(&[input(1, 0, StockSource::Baked)]).is_err());
        assert!(
            validate_items(&[
                input(1, 2, StockSource::Baked),
                input(1, 3, StockSource::Baked)
            ])
            .is_err()
        );
        // Same product, different source is a distinct line
        assert!(
            validate_items(&[
                input(1, 2, StockSource::Baked),
                input(1, 3, StockSource::Purchased)
            ])
            .is_ok()
        );
    }

    #[test]
    fn test_diff_increase() {
        let current = vec![item(1, 5, StockSource::Baked)];
        let desired = vec![input(1, 8, StockSource::Baked)];
        assert_eq!(
            diff_items(&current, &desired),
            vec![(1, StockSource::Baked, 3)]
        );
    }

    #[test]
    fn test_diff_removed_and_added_lines() {
        let current = vec![
            item(1, 5, StockSource::Baked),
            item(2, 4, StockSource::Purchased),
        ];
        let desired = vec![
            input(1, 5, StockSource::Baked),
            input(3, 6, StockSource::Baked),
        ];
        let deltas = diff_items(&current, &desired);
        assert_eq!(
            deltas,
            vec![
                (2, StockSource::Purchased, -4),
                (3, StockSource::Baked, 6)
            ]
        );
    }

    #[test]
    fn test_diff_no_change_is_empty() {
        let current = vec![item(1, 5, StockSource::Baked)];
        let desired = vec![input(1, 5, StockSource::Baked)];
        assert!(diff_items(&current, &desired).is_empty());
    }

    #[test]
    fn test_offline_attribution_preserved() {
        let a = resolve_attribution(10, true, Some(4));
        assert_eq!(a.creator_actor_id, 4);
        assert_eq!(a.synced_by_actor_id, Some(10));

        // Online submissions ignore original_actor_id
        let a = resolve_attribution(10, false, Some(4));
        assert_eq!(a.creator_actor_id, 10);
        assert_eq!(a.synced_by_actor_id, None);

        // Self-sync records no separate syncing actor
        let a = resolve_attribution(10, true, Some(10));
        assert_eq!(a.creator_actor_id, 10);
        assert_eq!(a.synced_by_actor_id, None);
    }
}
