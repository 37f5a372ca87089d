//! Branches (locations)

use shared::error::AppError;
use shared::models::Branch;
use shared::models::branch::{BranchCreate, BranchUpdate};
use sqlx::PgPool;

use crate::error::ServiceResult;

pub async fn list(pool: &PgPool) -> ServiceResult<Vec<Branch>> {
    Ok(sqlx::query_as("SELECT * FROM branches ORDER BY id")
        .fetch_all(pool)
        .await?)
}

pub async fn create(pool: &PgPool, data: &BranchCreate) -> ServiceResult<Branch> {
    Ok(sqlx::query_as(
        "INSERT INTO branches (name, address, phone) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(&data.name)
    .bind(&data.address)
    .bind(&data.phone)
    .fetch_one(pool)
    .await?)
}

pub async fn update(pool: &PgPool, branch_id: i64, data: &BranchUpdate) -> ServiceResult<Branch> {
    let branch: Option<Branch> = sqlx::query_as(
        r#"
        UPDATE branches SET
            name = COALESCE($2, name),
            address = COALESCE($3, address),
            phone = COALESCE($4, phone),
            is_active = COALESCE($5, is_active)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(branch_id)
    .bind(&data.name)
    .bind(&data.address)
    .bind(&data.phone)
    .bind(data.is_active)
    .fetch_optional(pool)
    .await?;
    branch.ok_or_else(|| AppError::not_found("Branch").into())
}

/// True when the actor may operate in the given branch: either their home
/// branch or one granted through `actor_branches`.
pub async fn actor_has_access(
    pool: &PgPool,
    actor_id: i64,
    branch_id: i64,
) -> ServiceResult<bool> {
    let (has,): (bool,) = sqlx::query_as(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM actors WHERE id = $1 AND branch_id = $2
            UNION
            SELECT 1 FROM actor_branches WHERE actor_id = $1 AND branch_id = $2
        )
        "#,
    )
    .bind(actor_id)
    .bind(branch_id)
    .fetch_one(pool)
    .await?;
    Ok(has)
}
