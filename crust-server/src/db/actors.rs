//! Actor (login account) storage

use shared::error::AppError;
use shared::models::{Actor, Role};
use sqlx::{PgPool, Postgres, Transaction};

use crate::error::ServiceResult;

pub async fn get(pool: &PgPool, actor_id: i64) -> ServiceResult<Actor> {
    let actor: Option<Actor> = sqlx::query_as("SELECT * FROM actors WHERE id = $1")
        .bind(actor_id)
        .fetch_optional(pool)
        .await?;
    actor.ok_or_else(|| AppError::not_found("Actor").into())
}

pub async fn get_by_username(pool: &PgPool, username: &str) -> ServiceResult<Option<Actor>> {
    Ok(sqlx::query_as("SELECT * FROM actors WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await?)
}

/// Duplicate search for the account-reuse path: match on username or the
/// phone-derived email.
pub async fn find_duplicate(
    tx: &mut Transaction<'_, Postgres>,
    username: &str,
    email: &str,
) -> ServiceResult<Option<Actor>> {
    Ok(
        sqlx::query_as("SELECT * FROM actors WHERE username = $1 OR email = $2 FOR UPDATE")
            .bind(username)
            .bind(email)
            .fetch_optional(&mut **tx)
            .await?,
    )
}

pub async fn list(pool: &PgPool) -> ServiceResult<Vec<Actor>> {
    Ok(sqlx::query_as("SELECT * FROM actors ORDER BY id")
        .fetch_all(pool)
        .await?)
}

pub async fn create(
    tx: &mut Transaction<'_, Postgres>,
    username: &str,
    email: &str,
    password_hash: &str,
    role: Role,
    branch_id: i64,
) -> ServiceResult<Actor> {
    Ok(sqlx::query_as(
        r#"
        INSERT INTO actors (username, email, password_hash, role, branch_id, hire_date)
        VALUES ($1, $2, $3, $4, $5, CURRENT_DATE)
        RETURNING *
        "#,
    )
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .bind(branch_id)
    .fetch_one(&mut **tx)
    .await?)
}

/// Reactivate a dormant account in place with fresh credentials.
pub async fn reactivate(
    tx: &mut Transaction<'_, Postgres>,
    actor_id: i64,
    username: &str,
    password_hash: &str,
    role: Role,
    branch_id: i64,
) -> ServiceResult<Actor> {
    Ok(sqlx::query_as(
        r#"
        UPDATE actors SET
            username = $2,
            password_hash = $3,
            role = $4,
            branch_id = $5,
            is_active = TRUE,
            termination_date = NULL,
            hire_date = CURRENT_DATE
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(actor_id)
    .bind(username)
    .bind(password_hash)
    .bind(role)
    .bind(branch_id)
    .fetch_one(&mut **tx)
    .await?)
}

/// Grant branch access (idempotent).
pub async fn upsert_branch_access(
    tx: &mut Transaction<'_, Postgres>,
    actor_id: i64,
    branch_id: i64,
) -> ServiceResult<()> {
    sqlx::query(
        r#"
        INSERT INTO actor_branches (actor_id, branch_id)
        VALUES ($1, $2)
        ON CONFLICT (actor_id, branch_id) DO NOTHING
        "#,
    )
    .bind(actor_id)
    .bind(branch_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Deactivate an account: soft-delete, stamp the termination date, and drop
/// every branch grant. The caller unlinks the staff profile.
pub async fn deactivate(tx: &mut Transaction<'_, Postgres>, actor_id: i64) -> ServiceResult<Actor> {
    sqlx::query("DELETE FROM actor_branches WHERE actor_id = $1")
        .bind(actor_id)
        .execute(&mut **tx)
        .await?;
    Ok(sqlx::query_as(
        r#"
        UPDATE actors SET is_active = FALSE, termination_date = CURRENT_DATE
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(actor_id)
    .fetch_one(&mut **tx)
    .await?)
}

pub async fn update_credentials(
    tx: &mut Transaction<'_, Postgres>,
    actor_id: i64,
    username: Option<&str>,
    email: Option<&str>,
    password_hash: Option<&str>,
    role: Option<Role>,
    branch_id: Option<i64>,
) -> ServiceResult<Actor> {
    let actor: Option<Actor> = sqlx::query_as(
        r#"
        UPDATE actors SET
            username = COALESCE($2, username),
            email = COALESCE($3, email),
            password_hash = COALESCE($4, password_hash),
            role = COALESCE($5, role),
            branch_id = COALESCE($6, branch_id)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(actor_id)
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .bind(branch_id)
    .fetch_optional(&mut **tx)
    .await?;
    actor.ok_or_else(|| AppError::not_found("Actor").into())
}

/// Admins of a branch (home-branch or granted); recipients for branch-level
/// notifications.
pub async fn branch_admins(
    tx: &mut Transaction<'_, Postgres>,
    branch_id: i64,
) -> ServiceResult<Vec<i64>> {
    let rows: Vec<(i64,)> = sqlx::query_as(
        r#"
        SELECT DISTINCT a.id FROM actors a
        LEFT JOIN actor_branches ab ON ab.actor_id = a.id
        WHERE a.is_active AND a.role = 'admin'
          AND (a.branch_id = $1 OR ab.branch_id = $1)
        "#,
    )
    .bind(branch_id)
    .fetch_all(&mut **tx)
    .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Admins and managers of a branch; recipients for alert notifications.
pub async fn branch_admins_and_managers(
    tx: &mut Transaction<'_, Postgres>,
    branch_id: i64,
) -> ServiceResult<Vec<i64>> {
    let rows: Vec<(i64,)> = sqlx::query_as(
        r#"
        SELECT DISTINCT a.id FROM actors a
        LEFT JOIN actor_branches ab ON ab.actor_id = a.id
        WHERE a.is_active AND a.role IN ('admin', 'manager')
          AND (a.branch_id = $1 OR ab.branch_id = $1)
        "#,
    )
    .bind(branch_id)
    .fetch_all(&mut **tx)
    .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}
