//! Sale write path (`POST /sales`, `POST /sales/:id/void`, `GET /sales`)

use axum::Json;
use axum::extract::{Path, Query, State};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::error::AppError;
use shared::models::Sale;
use shared::models::kpi::event_types;
use shared::models::sale::SaleCreate;

use crate::alerts;
use crate::auth::permissions::{self, Action};
use crate::auth::{AuthActor, BranchContext, IdemKey, QueuedMeta};
use crate::db::idempotency::{self, Admission};
use crate::db::{self, kpi};
use crate::state::AppState;

const CREATE_ENDPOINT: &str = "POST /sales";
const VOID_ENDPOINT: &str = "POST /sales/:id/void";

/// Commit a sale inside one transaction after idempotency admission. The
/// response stored against the key is returned bit-identically on replay.
pub async fn create(
    State(state): State<AppState>,
    actor: AuthActor,
    branch: BranchContext,
    IdemKey(key): IdemKey,
    queued: QueuedMeta,
    Json(payload): Json<SaleCreate>,
) -> Result<Json<serde_json::Value>, AppError> {
    permissions::require(actor.role, Action::RecordSale)?;

    let mut tx = db::begin_with_retry(&state.pool).await?;

    let admitted_key = match &key {
        Some(k) => {
            match idempotency::admit(&mut tx, actor.actor_id, k, CREATE_ENDPOINT).await? {
                Admission::Replayed(stored) => {
                    db::commit(tx).await?;
                    return Ok(Json(stored));
                }
                Admission::Admitted { key_id } => Some(key_id),
            }
        }
        None => None,
    };

    let receipt = db::sales::create(
        &mut tx,
        branch.branch_id,
        actor.actor_id,
        &payload,
        queued.is_queued,
    )
    .await?;

    kpi::insert_event(
        &mut tx,
        branch.branch_id,
        actor.actor_id,
        event_types::SALE_COMPLETED,
        None,
        receipt.total_amount,
        None,
        None,
    )
    .await?;
    if let Some(ms) = payload.cashier_timing_ms {
        kpi::insert_event(
            &mut tx,
            branch.branch_id,
            actor.actor_id,
            event_types::CASHIER_ORDER_DURATION,
            Some("cashier_order_ms"),
            Decimal::from(ms),
            Some(ms),
            None,
        )
        .await?;
    }

    alerts::evaluate_high_sale(
        &mut tx,
        branch.branch_id,
        receipt.total_amount,
        &receipt.receipt_number,
    )
    .await?;
    let product_ids: Vec<i64> = payload.items.iter().map(|i| i.product_id).collect();
    alerts::evaluate_low_stock(&mut tx, branch.branch_id, &product_ids).await?;

    let response = serde_json::to_value(&receipt)
        .map_err(|e| AppError::internal(format!("receipt serialization failed: {e}")))?;
    if let Some(key_id) = admitted_key {
        idempotency::store_response(&mut tx, key_id, &response).await?;
    }
    db::commit(tx).await?;

    tracing::info!(
        sale_id = receipt.id,
        receipt = %receipt.receipt_number,
        branch_id = branch.branch_id,
        "Sale committed"
    );
    Ok(Json(response))
}

/// Void a sale, compensating its ledger movements.
pub async fn void(
    State(state): State<AppState>,
    actor: AuthActor,
    IdemKey(key): IdemKey,
    Path(sale_id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    permissions::require(actor.role, Action::VoidSale)?;

    let mut tx = db::begin_with_retry(&state.pool).await?;

    let admitted_key = match &key {
        Some(k) => match idempotency::admit(&mut tx, actor.actor_id, k, VOID_ENDPOINT).await? {
            Admission::Replayed(stored) => {
                db::commit(tx).await?;
                return Ok(Json(stored));
            }
            Admission::Admitted { key_id } => Some(key_id),
        },
        None => None,
    };

    let sale = db::sales::get_for_update(&mut tx, sale_id).await?;
    let voided = db::sales::void(&mut tx, &sale, actor.actor_id).await?;

    kpi::insert_event(
        &mut tx,
        voided.branch_id,
        actor.actor_id,
        event_types::SALE_VOIDED,
        None,
        voided.total_amount,
        None,
        None,
    )
    .await?;

    let response = serde_json::to_value(&voided)
        .map_err(|e| AppError::internal(format!("sale serialization failed: {e}")))?;
    if let Some(key_id) = admitted_key {
        idempotency::store_response(&mut tx, key_id, &response).await?;
    }
    db::commit(tx).await?;

    tracing::info!(sale_id, "Sale voided");
    Ok(Json(response))
}

/// Sale detail with its line items, for receipt reprints and audit views.
pub async fn get(
    State(state): State<AppState>,
    _actor: AuthActor,
    Path(sale_id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let sale = db::sales::get(&state.pool, sale_id).await?;
    let items = db::sales::items(&state.pool, sale_id).await?;
    Ok(Json(serde_json::json!({
        "sale": sale,
        "items": items,
    })))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

pub async fn list(
    State(state): State<AppState>,
    _actor: AuthActor,
    branch: BranchContext,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Sale>>, AppError> {
    let limit = query.limit.unwrap_or(100).clamp(1, 500);
    let sales = db::sales::list(&state.pool, branch.branch_id, limit).await?;
    Ok(Json(sales))
}
