//! Branch (location) endpoints

use axum::Json;
use axum::extract::{Path, State};
use shared::error::AppError;
use shared::models::Branch;
use shared::models::branch::{BranchCreate, BranchUpdate};

use crate::auth::AuthActor;
use crate::auth::permissions::{self, Action};
use crate::db;
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    _actor: AuthActor,
) -> Result<Json<Vec<Branch>>, AppError> {
    Ok(Json(db::branches::list(&state.pool).await?))
}

pub async fn create(
    State(state): State<AppState>,
    actor: AuthActor,
    Json(payload): Json<BranchCreate>,
) -> Result<Json<Branch>, AppError> {
    permissions::require(actor.role, Action::ManageBranches)?;
    if payload.name.trim().is_empty() {
        return Err(AppError::validation("Branch name is required"));
    }
    Ok(Json(db::branches::create(&state.pool, &payload).await?))
}

pub async fn update(
    State(state): State<AppState>,
    actor: AuthActor,
    Path(branch_id): Path<i64>,
    Json(payload): Json<BranchUpdate>,
) -> Result<Json<Branch>, AppError> {
    permissions::require(actor.role, Action::ManageBranches)?;
    Ok(Json(
        db::branches::update(&state.pool, branch_id, &payload).await?,
    ))
}
