//! Login and admin account recovery

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use shared::models::Role;
use shared::models::actor::ActorView;
use validator::Validate;

use crate::auth::{jwt, password};
use crate::db;
use crate::state::AppState;

use super::validate_payload;

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 64))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub actor: ActorView,
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    validate_payload(&req)?;
    let actor = db::actors::get_by_username(&state.pool, &req.username)
        .await
        .map_err(AppError::from)?
        .ok_or_else(AppError::invalid_credentials)?;

    if !password::verify_password(&req.password, &actor.password_hash) {
        return Err(AppError::invalid_credentials());
    }
    if !actor.is_active {
        return Err(AppError::new(ErrorCode::AccountDisabled));
    }

    let token = jwt::create_token(actor.id, actor.role, actor.branch_id, &state.jwt_secret)
        .map_err(|e| AppError::internal(format!("token creation failed: {e}")))?;

    tracing::info!(actor_id = actor.id, "Actor logged in");
    Ok(Json(LoginResponse {
        token,
        actor: ActorView::from(&actor),
    }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct RecoverAdminRequest {
    #[validate(length(min = 1))]
    pub recovery_key: String,
    #[validate(length(min = 1, max = 64))]
    pub username: String,
    #[validate(length(min = 8, max = 128))]
    pub new_password: String,
}

/// Out-of-band admin password reset, gated on `ADMIN_RECOVERY_KEY`.
pub async fn recover_admin_account(
    State(state): State<AppState>,
    Json(req): Json<RecoverAdminRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    validate_payload(&req)?;
    let Some(expected) = &state.admin_recovery_key else {
        return Err(AppError::forbidden("Admin recovery is not configured"));
    };
    if &req.recovery_key != expected {
        return Err(AppError::forbidden("Invalid recovery key"));
    }

    let actor = db::actors::get_by_username(&state.pool, &req.username)
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| AppError::not_found("Actor"))?;
    if actor.role != Role::Admin {
        return Err(AppError::forbidden("Recovery applies to admin accounts only"));
    }

    let hash = password::hash_password(&req.new_password)?;
    let mut tx = db::begin_with_retry(&state.pool).await?;
    db::actors::update_credentials(&mut tx, actor.id, None, None, Some(&hash), None, None).await?;
    sqlx::query("UPDATE actors SET is_active = TRUE, termination_date = NULL WHERE id = $1")
        .bind(actor.id)
        .execute(&mut *tx)
        .await
        .map_err(crate::error::ServiceError::Db)?;
    db::commit(tx).await?;

    tracing::warn!(actor_id = actor.id, "Admin account recovered via recovery key");
    Ok(Json(serde_json::json!({ "recovered": true })))
}
