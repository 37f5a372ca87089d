//! Staff payment endpoints

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use shared::error::AppError;
use shared::models::StaffPayment;
use shared::models::finance::StaffPaymentCreate;

use crate::auth::permissions::{self, Action};
use crate::auth::{AuthActor, BranchContext};
use crate::db;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

pub async fn list(
    State(state): State<AppState>,
    _actor: AuthActor,
    branch: BranchContext,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<StaffPayment>>, AppError> {
    let limit = query.limit.unwrap_or(100).clamp(1, 500);
    Ok(Json(
        db::payments::list(&state.pool, branch.branch_id, limit).await?,
    ))
}

pub async fn create(
    State(state): State<AppState>,
    actor: AuthActor,
    branch: BranchContext,
    Json(payload): Json<StaffPaymentCreate>,
) -> Result<Json<StaffPayment>, AppError> {
    permissions::require(actor.role, Action::RecordStaffPayment)?;
    if payload.amount.is_sign_negative() {
        return Err(AppError::validation("Payment amount cannot be negative"));
    }
    Ok(Json(
        db::payments::create(&state.pool, branch.branch_id, actor.actor_id, &payload).await?,
    ))
}

pub async fn delete(
    State(state): State<AppState>,
    actor: AuthActor,
    branch: BranchContext,
    Path(payment_id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    permissions::require(actor.role, Action::RecordStaffPayment)?;
    db::payments::delete(&state.pool, branch.branch_id, payment_id).await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}
