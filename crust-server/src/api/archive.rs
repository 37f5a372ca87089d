//! Archive settings and runs

use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;
use shared::error::AppError;
use shared::models::archive::{ArchiveRunRequest, ArchiveSettingsUpdate};
use shared::models::{ArchiveRun, ArchiveSettings};

use crate::archive::engine;
use crate::auth::permissions::{self, Action};
use crate::auth::{AuthActor, BranchContext};
use crate::db;
use crate::state::AppState;

pub async fn get_settings(
    State(state): State<AppState>,
    actor: AuthActor,
    branch: BranchContext,
) -> Result<Json<ArchiveSettings>, AppError> {
    permissions::require(actor.role, Action::ManageArchive)?;
    Ok(Json(
        db::archive::ensure_settings(&state.pool, branch.branch_id).await?,
    ))
}

pub async fn update_settings(
    State(state): State<AppState>,
    actor: AuthActor,
    branch: BranchContext,
    Json(payload): Json<ArchiveSettingsUpdate>,
) -> Result<Json<ArchiveSettings>, AppError> {
    permissions::require(actor.role, Action::ManageArchive)?;
    if payload.retention_months.map(|m| m < 1).unwrap_or(false) {
        return Err(AppError::validation("retention_months must be at least 1"));
    }
    Ok(Json(
        db::archive::update_settings(&state.pool, branch.branch_id, &payload).await?,
    ))
}

/// Manual archive run; requires the branch's exact confirmation phrase.
pub async fn run(
    State(state): State<AppState>,
    actor: AuthActor,
    branch: BranchContext,
    Json(payload): Json<ArchiveRunRequest>,
) -> Result<Json<ArchiveRun>, AppError> {
    permissions::require(actor.role, Action::ManageArchive)?;
    let run = engine::manual_run(
        &state.pool,
        branch.branch_id,
        actor.actor_id,
        &payload.confirmation_phrase,
    )
    .await?;
    Ok(Json(run))
}

#[derive(Debug, Deserialize)]
pub struct RunsQuery {
    pub limit: Option<i64>,
}

pub async fn list_runs(
    State(state): State<AppState>,
    actor: AuthActor,
    branch: BranchContext,
    Query(query): Query<RunsQuery>,
) -> Result<Json<Vec<ArchiveRun>>, AppError> {
    permissions::require(actor.role, Action::ManageArchive)?;
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    Ok(Json(
        db::archive::list_runs(&state.pool, branch.branch_id, limit).await?,
    ))
}
