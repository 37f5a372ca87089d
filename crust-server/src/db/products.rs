//! Catalog: categories and products (global across branches)

use shared::error::AppError;
use shared::models::product::{ProductCreate, ProductUpdate};
use shared::models::{Category, Product};
use sqlx::PgPool;

use crate::error::ServiceResult;

pub async fn list(pool: &PgPool) -> ServiceResult<Vec<Product>> {
    Ok(
        sqlx::query_as("SELECT * FROM products WHERE is_active ORDER BY name")
            .fetch_all(pool)
            .await?,
    )
}

pub async fn get(pool: &PgPool, product_id: i64) -> ServiceResult<Product> {
    let product: Option<Product> = sqlx::query_as("SELECT * FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_optional(pool)
        .await?;
    product.ok_or_else(|| AppError::not_found("Product").into())
}

pub async fn create(pool: &PgPool, data: &ProductCreate) -> ServiceResult<Product> {
    Ok(sqlx::query_as(
        r#"
        INSERT INTO products (name, category_id, price, cost, unit)
        VALUES ($1, $2, $3, $4, COALESCE($5, 'piece'))
        RETURNING *
        "#,
    )
    .bind(&data.name)
    .bind(data.category_id)
    .bind(data.price)
    .bind(data.cost)
    .bind(&data.unit)
    .fetch_one(pool)
    .await?)
}

pub async fn update(pool: &PgPool, product_id: i64, data: &ProductUpdate) -> ServiceResult<Product> {
    let product: Option<Product> = sqlx::query_as(
        r#"
        UPDATE products SET
            name = COALESCE($2, name),
            category_id = COALESCE($3, category_id),
            price = COALESCE($4, price),
            cost = COALESCE($5, cost),
            unit = COALESCE($6, unit),
            is_active = COALESCE($7, is_active)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(product_id)
    .bind(&data.name)
    .bind(data.category_id)
    .bind(data.price)
    .bind(data.cost)
    .bind(&data.unit)
    .bind(data.is_active)
    .fetch_optional(pool)
    .await?;
    product.ok_or_else(|| AppError::not_found("Product").into())
}

/// Deactivate (soft-delete) a product; history keeps referencing it.
pub async fn deactivate(pool: &PgPool, product_id: i64) -> ServiceResult<()> {
    let result = sqlx::query("UPDATE products SET is_active = FALSE WHERE id = $1")
        .bind(product_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Product").into());
    }
    Ok(())
}

pub async fn list_categories(pool: &PgPool) -> ServiceResult<Vec<Category>> {
    Ok(
        sqlx::query_as("SELECT * FROM categories WHERE is_active ORDER BY name")
            .fetch_all(pool)
            .await?,
    )
}

pub async fn create_category(pool: &PgPool, name: &str) -> ServiceResult<Category> {
    Ok(
        sqlx::query_as("INSERT INTO categories (name) VALUES ($1) RETURNING *")
            .bind(name)
            .fetch_one(pool)
            .await?,
    )
}
