//! Staff and account administration

use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;
use shared::error::AppError;
use shared::models::actor::{ActorUpdate, ActorView};
use shared::models::staff::{StaffAccountCreate, StaffProfileCreate, StaffProfileUpdate};
use shared::models::{Role, StaffProfile};

use crate::auth::password;
use crate::auth::permissions::{self, Action};
use crate::auth::{AuthActor, BranchContext};
use crate::db;
use crate::state::AppState;

// ==================== Staff profiles ====================

pub async fn list_staff(
    State(state): State<AppState>,
    actor: AuthActor,
    branch: BranchContext,
) -> Result<Json<Vec<StaffProfile>>, AppError> {
    permissions::require(actor.role, Action::ManageStaff)?;
    Ok(Json(db::staff::list(&state.pool, branch.branch_id).await?))
}

pub async fn create_staff(
    State(state): State<AppState>,
    actor: AuthActor,
    Json(payload): Json<StaffProfileCreate>,
) -> Result<Json<StaffProfile>, AppError> {
    permissions::require(actor.role, Action::ManageStaff)?;
    if payload.full_name.trim().is_empty() {
        return Err(AppError::validation("Full name is required"));
    }
    Ok(Json(db::staff::create(&state.pool, &payload).await?))
}

pub async fn update_staff(
    State(state): State<AppState>,
    actor: AuthActor,
    Path(profile_id): Path<i64>,
    Json(payload): Json<StaffProfileUpdate>,
) -> Result<Json<StaffProfile>, AppError> {
    permissions::require(actor.role, Action::ManageStaff)?;
    Ok(Json(
        db::staff::update(&state.pool, profile_id, &payload).await?,
    ))
}

/// Archive a profile; requires the linked account to be archived first.
pub async fn archive_staff(
    State(state): State<AppState>,
    actor: AuthActor,
    Path(profile_id): Path<i64>,
) -> Result<Json<StaffProfile>, AppError> {
    permissions::require(actor.role, Action::ManageStaff)?;

    let mut tx = db::begin_with_retry(&state.pool).await?;
    let archived = db::staff::archive_profile(&mut tx, profile_id).await?;
    db::commit(tx).await?;

    tracing::info!(profile_id, "Staff profile archived");
    Ok(Json(archived))
}

// ==================== Accounts ====================

pub async fn list_users(
    State(state): State<AppState>,
    actor: AuthActor,
) -> Result<Json<Vec<ActorView>>, AppError> {
    permissions::require(actor.role, Action::ManageAccounts)?;
    let actors = db::actors::list(&state.pool).await?;
    Ok(Json(actors.iter().map(ActorView::from).collect()))
}

/// Create (or reuse) a login account for a staff profile.
pub async fn create_user(
    State(state): State<AppState>,
    actor: AuthActor,
    Json(payload): Json<StaffAccountCreate>,
) -> Result<Json<ActorView>, AppError> {
    permissions::require(actor.role, Action::ManageAccounts)?;
    if payload.username.trim().is_empty() {
        return Err(AppError::validation("Username is required"));
    }
    if payload.password.len() < 8 {
        return Err(AppError::validation("Password must be at least 8 characters"));
    }
    if payload.role == Role::Admin && actor.role != Role::Admin {
        return Err(AppError::forbidden("Only admins may grant the admin role"));
    }

    let hash = password::hash_password(&payload.password)?;
    let mut tx = db::begin_with_retry(&state.pool).await?;
    let created = db::staff::create_account(&mut tx, &payload, &hash).await?;
    db::commit(tx).await?;

    tracing::info!(
        actor_id = created.id,
        staff_profile_id = payload.staff_profile_id,
        "Account created for staff profile"
    );
    Ok(Json(ActorView::from(&created)))
}

pub async fn update_user(
    State(state): State<AppState>,
    actor: AuthActor,
    Path(actor_id): Path<i64>,
    Json(payload): Json<ActorUpdate>,
) -> Result<Json<ActorView>, AppError> {
    permissions::require(actor.role, Action::ManageAccounts)?;

    let hash = payload
        .password
        .as_deref()
        .map(password::hash_password)
        .transpose()?;

    let mut tx = db::begin_with_retry(&state.pool).await?;
    let updated = db::actors::update_credentials(
        &mut tx,
        actor_id,
        payload.username.as_deref(),
        payload.email.as_deref(),
        hash.as_deref(),
        payload.role,
        payload.branch_id,
    )
    .await?;
    if let Some(branch_id) = payload.branch_id {
        db::actors::upsert_branch_access(&mut tx, actor_id, branch_id).await?;
    }
    db::commit(tx).await?;

    Ok(Json(ActorView::from(&updated)))
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub is_active: bool,
}

/// Archive or reactivate an account. Archiving unlinks the staff profile
/// and clears branch grants; admin accounts cannot be archived.
pub async fn set_user_status(
    State(state): State<AppState>,
    actor: AuthActor,
    Path(actor_id): Path<i64>,
    Json(payload): Json<StatusUpdate>,
) -> Result<Json<ActorView>, AppError> {
    permissions::require(actor.role, Action::ManageAccounts)?;

    let target = db::actors::get(&state.pool, actor_id).await?;

    let mut tx = db::begin_with_retry(&state.pool).await?;
    let updated = if payload.is_active {
        sqlx::query_as::<_, shared::models::Actor>(
            "UPDATE actors SET is_active = TRUE, termination_date = NULL WHERE id = $1 RETURNING *",
        )
        .bind(actor_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(crate::error::ServiceError::Db)?
    } else {
        if target.role == Role::Admin {
            return Err(AppError::forbidden("Admin accounts cannot be archived"));
        }
        db::staff::unlink_actor(&mut tx, actor_id).await?;
        db::actors::deactivate(&mut tx, actor_id).await?
    };
    db::commit(tx).await?;

    tracing::info!(actor_id, is_active = payload.is_active, "Account status changed");
    Ok(Json(ActorView::from(&updated)))
}
