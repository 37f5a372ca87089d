//! Inventory ledger
//!
//! The only writer of `stock_levels`. Every stock mutation — batch intake,
//! sale deduction, void compensation, manual adjustment — goes through
//! [`apply_movements`], which locks the affected `(branch, product)` rows in
//! sorted order, rejects movements that would drive stock negative, appends
//! the ledger rows, and folds the net change into `stock_levels`.

use shared::error::AppError;
use shared::models::{MovementType, StockSource};
use sqlx::{Postgres, Transaction};
use std::collections::BTreeMap;

use crate::error::ServiceResult;

/// One stock movement to apply
#[derive(Debug, Clone)]
pub struct Movement {
    pub branch_id: i64,
    pub product_id: i64,
    pub movement_type: MovementType,
    pub quantity_change: i32,
    pub source: StockSource,
    pub reference_type: &'static str,
    pub reference_id: Option<i64>,
    pub actor_id: i64,
    pub metadata: Option<serde_json::Value>,
}

/// Net effect on one `(branch, product)` pair: total change plus the source
/// of the pair's final movement (carried onto `stock_levels`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairDelta {
    pub net_change: i32,
    pub last_source: StockSource,
}

/// Fold movements into per-pair deltas, keyed in sorted order.
///
/// `BTreeMap` ordering is the lock-acquisition order: lexicographic by
/// `(branch_id, product_id)`, which keeps concurrent ledger writers from
/// deadlocking on overlapping products.
pub fn aggregate_pairs(movements: &[Movement]) -> BTreeMap<(i64, i64), PairDelta> {
    let mut pairs: BTreeMap<(i64, i64), PairDelta> = BTreeMap::new();
    for m in movements {
        pairs
            .entry((m.branch_id, m.product_id))
            .and_modify(|d| {
                d.net_change += m.quantity_change;
                d.last_source = m.source;
            })
            .or_insert(PairDelta {
                net_change: m.quantity_change,
                last_source: m.source,
            });
    }
    pairs
}

/// Atomically apply a set of movements.
///
/// On a would-be-negative result the whole transaction is poisoned with
/// `INSUFFICIENT_STOCK {product_id, current, requested}`; nothing is
/// partially applied.
pub async fn apply_movements(
    tx: &mut Transaction<'_, Postgres>,
    movements: &[Movement],
) -> ServiceResult<()> {
    if movements.is_empty() {
        return Ok(());
    }

    let pairs = aggregate_pairs(movements);

    // Lock every affected pair in sorted order. The no-op upsert both
    // creates missing rows and takes the row lock in one statement.
    for (&(branch_id, product_id), delta) in &pairs {
        let (current,): (i32,) = sqlx::query_as(
            r#"
            INSERT INTO stock_levels (branch_id, product_id, quantity, source)
            VALUES ($1, $2, 0, $3)
            ON CONFLICT (branch_id, product_id)
            DO UPDATE SET quantity = stock_levels.quantity
            RETURNING quantity
            "#,
        )
        .bind(branch_id)
        .bind(product_id)
        .bind(delta.last_source)
        .fetch_one(&mut **tx)
        .await?;

        let resulting = current + delta.net_change;
        if resulting < 0 {
            return Err(AppError::insufficient_stock(
                product_id,
                current,
                -delta.net_change,
            )
            .into());
        }
    }

    // Append one ledger row per movement, preserving source.
    for m in movements {
        sqlx::query(
            r#"
            INSERT INTO inventory_movements
                (branch_id, product_id, movement_type, quantity_change, source,
                 reference_type, reference_id, actor_id, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(m.branch_id)
        .bind(m.product_id)
        .bind(m.movement_type)
        .bind(m.quantity_change)
        .bind(m.source)
        .bind(m.reference_type)
        .bind(m.reference_id)
        .bind(m.actor_id)
        .bind(&m.metadata)
        .execute(&mut **tx)
        .await?;
    }

    // Fold the net change into the locked stock rows.
    for (&(branch_id, product_id), delta) in &pairs {
        sqlx::query(
            r#"
            UPDATE stock_levels
            SET quantity = quantity + $3, source = $4, last_updated = now()
            WHERE branch_id = $1 AND product_id = $2
            "#,
        )
        .bind(branch_id)
        .bind(product_id)
        .bind(delta.net_change)
        .bind(delta.last_source)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

/// Read the locked stock quantity for one pair after movements were applied.
/// Used by the low-stock alert evaluation inside the same transaction.
pub async fn stock_quantity(
    tx: &mut Transaction<'_, Postgres>,
    branch_id: i64,
    product_id: i64,
) -> ServiceResult<i32> {
    let row: Option<(i32,)> = sqlx::query_as(
        "SELECT quantity FROM stock_levels WHERE branch_id = $1 AND product_id = $2",
    )
    .bind(branch_id)
    .bind(product_id)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(row.map(|(q,)| q).unwrap_or(0))
}

/// Lock one pair and read its quantity, for read-modify-write callers
/// (manual adjustments compute a delta from the current value).
pub async fn locked_quantity(
    tx: &mut Transaction<'_, Postgres>,
    branch_id: i64,
    product_id: i64,
) -> ServiceResult<i32> {
    let row: Option<(i32,)> = sqlx::query_as(
        "SELECT quantity FROM stock_levels WHERE branch_id = $1 AND product_id = $2 FOR UPDATE",
    )
    .bind(branch_id)
    .bind(product_id)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(row.map(|(q,)| q).unwrap_or(0))
}

/// Current stock levels for a branch.
pub async fn list_stock(
    pool: &sqlx::PgPool,
    branch_id: i64,
) -> ServiceResult<Vec<shared::models::StockLevel>> {
    Ok(sqlx::query_as(
        "SELECT * FROM stock_levels WHERE branch_id = $1 ORDER BY product_id",
    )
    .bind(branch_id)
    .fetch_all(pool)
    .await?)
}

/// Recent ledger rows for a branch, newest first.
pub async fn list_movements(
    pool: &sqlx::PgPool,
    branch_id: i64,
    limit: i64,
) -> ServiceResult<Vec<shared::models::InventoryMovement>> {
    Ok(sqlx::query_as(
        "SELECT * FROM inventory_movements WHERE branch_id = $1 ORDER BY id DESC LIMIT $2",
    )
    .bind(branch_id)
    .bind(limit)
    .fetch_all(pool)
    .await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movement(branch: i64, product: i64, change: i32, source: StockSource) -> Movement {
        Movement {
            branch_id: branch,
            product_id: product,
            movement_type: if change >= 0 {
                MovementType::BatchIn
            } else {
                MovementType::SaleOut
            },
            quantity_change: change,
            source,
            reference_type: "batch",
            reference_id: Some(1),
            actor_id: 1,
            metadata: None,
        }
    }

    #[test]
    fn test_aggregate_sums_per_pair() {
        let movements = vec![
            movement(1, 10, 5, StockSource::Baked),
            movement(1, 10, 3, StockSource::Purchased),
            movement(1, 11, -2, StockSource::Baked),
        ];
        let pairs = aggregate_pairs(&movements);

        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[&(1, 10)].net_change, 8);
        // A half baked / half purchased product carries the final source
        assert_eq!(pairs[&(1, 10)].last_source, StockSource::Purchased);
        assert_eq!(pairs[&(1, 11)].net_change, -2);
    }

    #[test]
    fn test_aggregate_lock_order_is_sorted() {
        let movements = vec![
            movement(2, 7, 1, StockSource::Baked),
            movement(1, 99, 1, StockSource::Baked),
            movement(1, 3, 1, StockSource::Baked),
            movement(2, 1, 1, StockSource::Baked),
        ];
        let keys: Vec<(i64, i64)> = aggregate_pairs(&movements).into_keys().collect();
        assert_eq!(keys, vec![(1, 3), (1, 99), (2, 1), (2, 7)]);
    }

    #[test]
    fn test_aggregate_cancelling_movements() {
        let movements = vec![
            movement(1, 10, 5, StockSource::Baked),
            movement(1, 10, -5, StockSource::Baked),
        ];
        let pairs = aggregate_pairs(&movements);
        assert_eq!(pairs[&(1, 10)].net_change, 0);
    }
}
