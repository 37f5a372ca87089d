//! Archival storage operations
//!
//! Row movement between hot tables and their archive mirrors. Each move is
//! `INSERT .. SELECT .. ON CONFLICT DO NOTHING` followed by a `DELETE` of
//! the same predicate, always inside the engine's per-branch transaction;
//! child tables are archived before their parent is deleted so a failure
//! can never leave dangling children.

use chrono::{DateTime, Utc};
use shared::error::AppError;
use shared::models::archive::{ArchiveSettingsUpdate, default_confirmation_phrase};
use shared::models::{ArchiveRun, ArchiveRunStatus, ArchiveRunType, ArchiveSettings};
use sqlx::{PgPool, Postgres, Transaction};

use crate::error::ServiceResult;

/// Load the branch's settings, seeding the default row on first access.
pub async fn ensure_settings(pool: &PgPool, branch_id: i64) -> ServiceResult<ArchiveSettings> {
    let existing: Option<ArchiveSettings> =
        sqlx::query_as("SELECT * FROM archive_settings WHERE branch_id = $1")
            .bind(branch_id)
            .fetch_optional(pool)
            .await?;
    if let Some(settings) = existing {
        return Ok(settings);
    }

    let phrase = default_confirmation_phrase(shared::models::archive::DEFAULT_RETENTION_MONTHS);
    Ok(sqlx::query_as(
        r#"
        INSERT INTO archive_settings (branch_id, confirmation_phrase)
        VALUES ($1, $2)
        ON CONFLICT (branch_id) DO UPDATE SET branch_id = EXCLUDED.branch_id
        RETURNING *
        "#,
    )
    .bind(branch_id)
    .bind(phrase)
    .fetch_one(pool)
    .await?)
}

pub async fn update_settings(
    pool: &PgPool,
    branch_id: i64,
    data: &ArchiveSettingsUpdate,
) -> ServiceResult<ArchiveSettings> {
    // Seed first so a PUT on a fresh branch behaves like a partial update
    ensure_settings(pool, branch_id).await?;

    let settings: Option<ArchiveSettings> = sqlx::query_as(
        r#"
        UPDATE archive_settings SET
            enabled = COALESCE($2, enabled),
            retention_months = COALESCE($3, retention_months),
            cold_storage_after_months = COALESCE($4, cold_storage_after_months),
            confirmation_phrase = COALESCE($5, confirmation_phrase)
        WHERE branch_id = $1
        RETURNING *
        "#,
    )
    .bind(branch_id)
    .bind(data.enabled)
    .bind(data.retention_months)
    .bind(data.cold_storage_after_months)
    .bind(&data.confirmation_phrase)
    .fetch_optional(pool)
    .await?;
    settings.ok_or_else(|| AppError::not_found("Archive settings").into())
}

/// Settings for every active branch, for the scheduled runner.
pub async fn settings_for_active_branches(pool: &PgPool) -> ServiceResult<Vec<ArchiveSettings>> {
    let branch_ids: Vec<(i64,)> = sqlx::query_as("SELECT id FROM branches WHERE is_active")
        .fetch_all(pool)
        .await?;
    let mut out = Vec::with_capacity(branch_ids.len());
    for (branch_id,) in branch_ids {
        out.push(ensure_settings(pool, branch_id).await?);
    }
    Ok(out)
}

pub async fn touch_last_run(
    tx: &mut Transaction<'_, Postgres>,
    branch_id: i64,
) -> ServiceResult<()> {
    sqlx::query("UPDATE archive_settings SET last_run_at = now() WHERE branch_id = $1")
        .bind(branch_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn touch_last_reminder(pool: &PgPool, branch_id: i64) -> ServiceResult<()> {
    sqlx::query("UPDATE archive_settings SET last_reminder_at = now() WHERE branch_id = $1")
        .bind(branch_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Record a run outcome. Successful runs are written inside the work
/// transaction; failed/skipped runs go straight to the pool so they survive
/// the rollback.
pub async fn insert_run<'e, E>(
    executor: E,
    branch_id: i64,
    triggered_by_actor_id: Option<i64>,
    run_type: ArchiveRunType,
    status: ArchiveRunStatus,
    cutoff_at: DateTime<Utc>,
    details: serde_json::Value,
    error_message: Option<&str>,
) -> ServiceResult<ArchiveRun>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    Ok(sqlx::query_as(
        r#"
        INSERT INTO archive_runs
            (branch_id, triggered_by_actor_id, run_type, status, cutoff_at, details, error_message)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(branch_id)
    .bind(triggered_by_actor_id)
    .bind(run_type)
    .bind(status)
    .bind(cutoff_at)
    .bind(details)
    .bind(error_message)
    .fetch_one(executor)
    .await?)
}

pub async fn list_runs(pool: &PgPool, branch_id: i64, limit: i64) -> ServiceResult<Vec<ArchiveRun>> {
    Ok(sqlx::query_as(
        "SELECT * FROM archive_runs WHERE branch_id = $1 ORDER BY created_at DESC LIMIT $2",
    )
    .bind(branch_id)
    .bind(limit)
    .fetch_all(pool)
    .await?)
}

// ==================== Row movement ====================

/// Move aged batches and their items. Items are copied first; the batch
/// delete cascades to the hot items in the same statement.
pub async fn move_batches(
    tx: &mut Transaction<'_, Postgres>,
    branch_id: i64,
    cutoff_at: DateTime<Utc>,
) -> ServiceResult<(u64, u64)> {
    let items = sqlx::query(
        r#"
        INSERT INTO batch_items_archive
        SELECT bi.* FROM batch_items bi
        JOIN batches b ON b.id = bi.batch_id
        WHERE b.branch_id = $1 AND b.created_at < $2
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(branch_id)
    .bind(cutoff_at)
    .execute(&mut **tx)
    .await?
    .rows_affected();

    let batches = sqlx::query(
        r#"
        INSERT INTO batches_archive
        SELECT * FROM batches
        WHERE branch_id = $1 AND created_at < $2
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(branch_id)
    .bind(cutoff_at)
    .execute(&mut **tx)
    .await?
    .rows_affected();

    sqlx::query("DELETE FROM batches WHERE branch_id = $1 AND created_at < $2")
        .bind(branch_id)
        .bind(cutoff_at)
        .execute(&mut **tx)
        .await?;

    Ok((batches, items))
}

/// Move aged sales and their items.
pub async fn move_sales(
    tx: &mut Transaction<'_, Postgres>,
    branch_id: i64,
    cutoff_at: DateTime<Utc>,
) -> ServiceResult<(u64, u64)> {
    let items = sqlx::query(
        r#"
        INSERT INTO sale_items_archive
        SELECT si.* FROM sale_items si
        JOIN sales s ON s.id = si.sale_id
        WHERE s.branch_id = $1 AND s.sale_date < $2
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(branch_id)
    .bind(cutoff_at)
    .execute(&mut **tx)
    .await?
    .rows_affected();

    let sales = sqlx::query(
        r#"
        INSERT INTO sales_archive
        SELECT * FROM sales
        WHERE branch_id = $1 AND sale_date < $2
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(branch_id)
    .bind(cutoff_at)
    .execute(&mut **tx)
    .await?
    .rows_affected();

    sqlx::query("DELETE FROM sales WHERE branch_id = $1 AND sale_date < $2")
        .bind(branch_id)
        .bind(cutoff_at)
        .execute(&mut **tx)
        .await?;

    Ok((sales, items))
}

/// Move one flat aged table. `table` and `archive_table` are compile-time
/// constants supplied by the engine, never user input.
async fn move_flat(
    tx: &mut Transaction<'_, Postgres>,
    table: &str,
    archive_table: &str,
    time_column: &str,
    branch_id: i64,
    cutoff_at: DateTime<Utc>,
) -> ServiceResult<u64> {
    let insert = format!(
        "INSERT INTO {archive_table} SELECT * FROM {table} \
         WHERE branch_id = $1 AND {time_column} < $2 ON CONFLICT (id) DO NOTHING"
    );
    let moved = sqlx::query(&insert)
        .bind(branch_id)
        .bind(cutoff_at)
        .execute(&mut **tx)
        .await?
        .rows_affected();

    let delete = format!("DELETE FROM {table} WHERE branch_id = $1 AND {time_column} < $2");
    sqlx::query(&delete)
        .bind(branch_id)
        .bind(cutoff_at)
        .execute(&mut **tx)
        .await?;

    Ok(moved)
}

pub async fn move_movements(
    tx: &mut Transaction<'_, Postgres>,
    branch_id: i64,
    cutoff_at: DateTime<Utc>,
) -> ServiceResult<u64> {
    move_flat(
        tx,
        "inventory_movements",
        "inventory_movements_archive",
        "created_at",
        branch_id,
        cutoff_at,
    )
    .await
}

pub async fn move_kpi_events(
    tx: &mut Transaction<'_, Postgres>,
    branch_id: i64,
    cutoff_at: DateTime<Utc>,
) -> ServiceResult<u64> {
    move_flat(
        tx,
        "kpi_events",
        "kpi_events_archive",
        "created_at",
        branch_id,
        cutoff_at,
    )
    .await
}

pub async fn move_expenses(
    tx: &mut Transaction<'_, Postgres>,
    branch_id: i64,
    cutoff_at: DateTime<Utc>,
) -> ServiceResult<u64> {
    move_flat(
        tx,
        "expenses",
        "expenses_archive",
        "created_at",
        branch_id,
        cutoff_at,
    )
    .await
}

pub async fn move_staff_payments(
    tx: &mut Transaction<'_, Postgres>,
    branch_id: i64,
    cutoff_at: DateTime<Utc>,
) -> ServiceResult<u64> {
    move_flat(
        tx,
        "staff_payments",
        "staff_payments_archive",
        "created_at",
        branch_id,
        cutoff_at,
    )
    .await
}
