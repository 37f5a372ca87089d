//! Stock views and manual adjustments
//!
//! Direct stock changes go through the same ledger as everything else, as
//! `manual_adjustment` movements; the payload carries the desired absolute
//! quantity and the handler derives the signed delta under the row lock.

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use shared::error::AppError;
use shared::models::stock::StockAdjustment;
use shared::models::{InventoryMovement, MovementType, StockLevel, StockSource};

use crate::auth::permissions::{self, Action};
use crate::auth::{AuthActor, BranchContext, IdemKey};
use crate::db::idempotency::{self, Admission};
use crate::db;
use crate::db::ledger::{self, Movement};
use crate::state::AppState;

const ADJUST_ENDPOINT: &str = "PUT /inventory/:product_id";
const ZERO_ENDPOINT: &str = "DELETE /inventory/:product_id";

pub async fn list(
    State(state): State<AppState>,
    _actor: AuthActor,
    branch: BranchContext,
) -> Result<Json<Vec<StockLevel>>, AppError> {
    let stock = ledger::list_stock(&state.pool, branch.branch_id).await?;
    Ok(Json(stock))
}

#[derive(Debug, Deserialize)]
pub struct MovementsQuery {
    pub limit: Option<i64>,
}

pub async fn movements(
    State(state): State<AppState>,
    _actor: AuthActor,
    branch: BranchContext,
    Query(query): Query<MovementsQuery>,
) -> Result<Json<Vec<InventoryMovement>>, AppError> {
    let limit = query.limit.unwrap_or(200).clamp(1, 1000);
    let movements = ledger::list_movements(&state.pool, branch.branch_id, limit).await?;
    Ok(Json(movements))
}

/// Set the absolute stock quantity for one product.
pub async fn adjust(
    State(state): State<AppState>,
    actor: AuthActor,
    branch: BranchContext,
    IdemKey(key): IdemKey,
    Path(product_id): Path<i64>,
    Json(payload): Json<StockAdjustment>,
) -> Result<Json<serde_json::Value>, AppError> {
    permissions::require(actor.role, Action::AdjustStock)?;
    if payload.quantity < 0 {
        return Err(AppError::validation("Stock quantity cannot be negative"));
    }

    apply_adjustment(
        &state,
        actor,
        branch,
        key,
        ADJUST_ENDPOINT,
        product_id,
        payload.quantity,
        payload.source.unwrap_or(StockSource::Baked),
        payload.reason,
    )
    .await
}

/// Zero out one product's stock (`DELETE /inventory/:product_id`).
pub async fn zero_out(
    State(state): State<AppState>,
    actor: AuthActor,
    branch: BranchContext,
    IdemKey(key): IdemKey,
    Path(product_id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    permissions::require(actor.role, Action::AdjustStock)?;
    apply_adjustment(
        &state,
        actor,
        branch,
        key,
        ZERO_ENDPOINT,
        product_id,
        0,
        StockSource::Baked,
        Some("stock cleared".to_string()),
    )
    .await
}

#[allow(clippy::too_many_arguments)]
async fn apply_adjustment(
    state: &AppState,
    actor: AuthActor,
    branch: BranchContext,
    key: Option<String>,
    endpoint: &str,
    product_id: i64,
    desired_quantity: i32,
    source: StockSource,
    reason: Option<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    // Reject unknown products up front; the ledger would happily create a
    // stock row for any id otherwise.
    db::products::get(&state.pool, product_id).await?;

    let mut tx = db::begin_with_retry(&state.pool).await?;

    let admitted_key = match &key {
        Some(k) => match idempotency::admit(&mut tx, actor.actor_id, k, endpoint).await? {
            Admission::Replayed(stored) => {
                db::commit(tx).await?;
                return Ok(Json(stored));
            }
            Admission::Admitted { key_id } => Some(key_id),
        },
        None => None,
    };

    let current = ledger::locked_quantity(&mut tx, branch.branch_id, product_id).await?;
    let delta = desired_quantity - current;
    if delta != 0 {
        let metadata = reason.map(|r| serde_json::json!({ "reason": r }));
        ledger::apply_movements(
            &mut tx,
            &[Movement {
                branch_id: branch.branch_id,
                product_id,
                movement_type: MovementType::ManualAdjustment,
                quantity_change: delta,
                source,
                reference_type: "adjustment",
                reference_id: None,
                actor_id: actor.actor_id,
                metadata,
            }],
        )
        .await?;
    }

    let response = serde_json::json!({
        "product_id": product_id,
        "branch_id": branch.branch_id,
        "previous_quantity": current,
        "quantity": desired_quantity,
    });
    if let Some(key_id) = admitted_key {
        idempotency::store_response(&mut tx, key_id, &response).await?;
    }
    db::commit(tx).await?;

    tracing::info!(product_id, branch_id = branch.branch_id, delta, "Stock adjusted");
    Ok(Json(response))
}
