//! Catalog endpoints

use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;
use shared::error::AppError;
use shared::models::product::{ProductCreate, ProductUpdate};
use shared::models::{Category, Product};

use crate::auth::AuthActor;
use crate::auth::permissions::{self, Action};
use crate::db;
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    _actor: AuthActor,
) -> Result<Json<Vec<Product>>, AppError> {
    Ok(Json(db::products::list(&state.pool).await?))
}

pub async fn create(
    State(state): State<AppState>,
    actor: AuthActor,
    Json(payload): Json<ProductCreate>,
) -> Result<Json<Product>, AppError> {
    permissions::require(actor.role, Action::ManageCatalog)?;
    if payload.price.is_sign_negative() {
        return Err(AppError::validation("Price cannot be negative"));
    }
    Ok(Json(db::products::create(&state.pool, &payload).await?))
}

pub async fn update(
    State(state): State<AppState>,
    actor: AuthActor,
    Path(product_id): Path<i64>,
    Json(payload): Json<ProductUpdate>,
) -> Result<Json<Product>, AppError> {
    permissions::require(actor.role, Action::ManageCatalog)?;
    if payload.price.map(|p| p.is_sign_negative()).unwrap_or(false) {
        return Err(AppError::validation("Price cannot be negative"));
    }
    Ok(Json(
        db::products::update(&state.pool, product_id, &payload).await?,
    ))
}

pub async fn delete(
    State(state): State<AppState>,
    actor: AuthActor,
    Path(product_id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    permissions::require(actor.role, Action::ManageCatalog)?;
    db::products::deactivate(&state.pool, product_id).await?;
    Ok(Json(serde_json::json!({ "deactivated": true })))
}

pub async fn list_categories(
    State(state): State<AppState>,
    _actor: AuthActor,
) -> Result<Json<Vec<Category>>, AppError> {
    Ok(Json(db::products::list_categories(&state.pool).await?))
}

#[derive(Debug, Deserialize)]
pub struct CategoryCreate {
    pub name: String,
}

pub async fn create_category(
    State(state): State<AppState>,
    actor: AuthActor,
    Json(payload): Json<CategoryCreate>,
) -> Result<Json<Category>, AppError> {
    permissions::require(actor.role, Action::ManageCatalog)?;
    if payload.name.trim().is_empty() {
        return Err(AppError::validation("Category name is required"));
    }
    Ok(Json(
        db::products::create_category(&state.pool, payload.name.trim()).await?,
    ))
}
