//! Notification and alert-rule endpoints

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use shared::error::AppError;
use shared::models::kpi::event_types;
use shared::models::notification::{AlertRuleCreate, AlertRuleUpdate};
use shared::models::{AlertRule, Notification};

use crate::auth::AuthActor;
use crate::auth::permissions::{self, Action};
use crate::db;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub unread: bool,
    pub limit: Option<i64>,
}

pub async fn list(
    State(state): State<AppState>,
    actor: AuthActor,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Notification>>, AppError> {
    let limit = query.limit.unwrap_or(100).clamp(1, 500);
    Ok(Json(
        db::notifications::list_for_actor(&state.pool, actor.actor_id, query.unread, limit)
            .await?,
    ))
}

pub async fn mark_read(
    State(state): State<AppState>,
    actor: AuthActor,
    Path(notification_id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    db::notifications::mark_read(&state.pool, actor.actor_id, notification_id).await?;
    Ok(Json(serde_json::json!({ "read": true })))
}

pub async fn list_rules(
    State(state): State<AppState>,
    actor: AuthActor,
) -> Result<Json<Vec<AlertRule>>, AppError> {
    permissions::require(actor.role, Action::ManageAlertRules)?;
    Ok(Json(db::notifications::list_rules(&state.pool).await?))
}

pub async fn create_rule(
    State(state): State<AppState>,
    actor: AuthActor,
    Json(payload): Json<AlertRuleCreate>,
) -> Result<Json<AlertRule>, AppError> {
    permissions::require(actor.role, Action::ManageAlertRules)?;
    if payload.event_type != event_types::HIGH_SALE && payload.event_type != event_types::LOW_STOCK
    {
        return Err(AppError::validation(
            "event_type must be high_sale or low_stock",
        ));
    }
    Ok(Json(
        db::notifications::create_rule(&state.pool, &payload).await?,
    ))
}

pub async fn update_rule(
    State(state): State<AppState>,
    actor: AuthActor,
    Path(rule_id): Path<i64>,
    Json(payload): Json<AlertRuleUpdate>,
) -> Result<Json<AlertRule>, AppError> {
    permissions::require(actor.role, Action::ManageAlertRules)?;
    Ok(Json(
        db::notifications::update_rule(&state.pool, rule_id, &payload).await?,
    ))
}

pub async fn delete_rule(
    State(state): State<AppState>,
    actor: AuthActor,
    Path(rule_id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    permissions::require(actor.role, Action::ManageAlertRules)?;
    db::notifications::delete_rule(&state.pool, rule_id).await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}
