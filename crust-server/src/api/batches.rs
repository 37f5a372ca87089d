//! Production batch endpoints

use axum::Json;
use axum::extract::{Path, Query, State};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::error::AppError;
use shared::models::batch::{BatchCreate, BatchEdit, BatchWithItems};
use shared::models::kpi::event_types;

use crate::auth::permissions::{self, Action};
use crate::auth::{AuthActor, BranchContext, IdemKey, QueuedMeta};
use crate::db::batches::BatchActor;
use crate::db::idempotency::{self, Admission};
use crate::db::{self, kpi};
use crate::state::AppState;

const CREATE_ENDPOINT: &str = "POST /inventory/batches";
const EDIT_ENDPOINT: &str = "PUT /inventory/batches/:id";
const VOID_ENDPOINT: &str = "POST /inventory/batches/:id/void";

pub async fn create(
    State(state): State<AppState>,
    actor: AuthActor,
    branch: BranchContext,
    IdemKey(key): IdemKey,
    queued: QueuedMeta,
    Json(mut payload): Json<BatchCreate>,
) -> Result<Json<serde_json::Value>, AppError> {
    permissions::require(actor.role, Action::CreateBatch)?;

    // Replayed queue operations may carry attribution in headers instead of
    // the payload
    if queued.is_queued {
        payload.is_offline = true;
        if payload.original_actor_id.is_none() {
            payload.original_actor_id = queued.offline_actor_id;
        }
        tracing::debug!(
            original_actor_id = queued.offline_actor_id,
            queued_created_at = queued.queued_created_at,
            "Replaying queued batch submission"
        );
    }

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

    let created = db::batches::create(&mut tx, branch.branch_id, actor.actor_id, &payload).await?;

    let total_units: i32 = created.items.iter().map(|i| i.quantity).sum();
    kpi::insert_event(
        &mut tx,
        branch.branch_id,
        actor.actor_id,
        event_types::BATCH_CREATED,
        None,
        Decimal::from(total_units),
        None,
        None,
    )
    .await?;

    let response = serde_json::to_value(&created)
        .map_err(|e| AppError::internal(format!("batch serialization failed: {e}")))?;
    if let Some(key_id) = admitted_key {
        idempotency::store_response(&mut tx, key_id, &response).await?;
    }
    db::commit(tx).await?;

    tracing::info!(batch_id = created.batch.id, branch_id = branch.branch_id, "Batch created");
    Ok(Json(response))
}

/// Edit a batch within its window; the diff becomes compensating movements.
pub async fn edit(
    State(state): State<AppState>,
    actor: AuthActor,
    IdemKey(key): IdemKey,
    Path(batch_id): Path<i64>,
    Json(payload): Json<BatchEdit>,
) -> Result<Json<serde_json::Value>, AppError> {
    permissions::require(actor.role, Action::ModifyBatch)?;

    let mut tx = db::begin_with_retry(&state.pool).await?;

    let admitted_key = match &key {
        Some(k) => match idempotency::admit(&mut tx, actor.actor_id, k, EDIT_ENDPOINT).await? {
            Admission::Replayed(stored) => {
                db::commit(tx).await?;
                return Ok(Json(stored));
            }
            Admission::Admitted { key_id } => Some(key_id),
        },
        None => None,
    };

    let batch = db::batches::get_for_update(&mut tx, batch_id).await?;
    db::batches::check_modifiable(
        &batch,
        BatchActor {
            actor_id: actor.actor_id,
            role: actor.role,
        },
        chrono::Utc::now(),
        state.batch_edit_window,
    )?;

    let edited = db::batches::edit(&mut tx, &batch, actor.actor_id, &payload).await?;

    let response = serde_json::to_value(&edited)
        .map_err(|e| AppError::internal(format!("batch serialization failed: {e}")))?;
    if let Some(key_id) = admitted_key {
        idempotency::store_response(&mut tx, key_id, &response).await?;
    }
    db::commit(tx).await?;

    tracing::info!(batch_id, "Batch edited");
    Ok(Json(response))
}

pub async fn void(
    State(state): State<AppState>,
    actor: AuthActor,
    IdemKey(key): IdemKey,
    Path(batch_id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    permissions::require(actor.role, Action::ModifyBatch)?;

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

    let batch = db::batches::get_for_update(&mut tx, batch_id).await?;
    db::batches::check_modifiable(
        &batch,
        BatchActor {
            actor_id: actor.actor_id,
            role: actor.role,
        },
        chrono::Utc::now(),
        state.batch_edit_window,
    )?;

    let voided = db::batches::void(&mut tx, &batch, actor.actor_id).await?;

    let response = serde_json::to_value(&voided)
        .map_err(|e| AppError::internal(format!("batch serialization failed: {e}")))?;
    if let Some(key_id) = admitted_key {
        idempotency::store_response(&mut tx, key_id, &response).await?;
    }
    db::commit(tx).await?;

    tracing::info!(batch_id, "Batch voided");
    Ok(Json(response))
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
) -> Result<Json<Vec<BatchWithItems>>, AppError> {
    let limit = query.limit.unwrap_or(100).clamp(1, 500);
    let batches = db::batches::list(&state.pool, branch.branch_id, limit).await?;
    Ok(Json(batches))
}
