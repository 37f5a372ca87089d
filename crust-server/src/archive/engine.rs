//! Archival engine
//!
//! Moves rows older than the branch's retention window into the archive
//! mirrors. One transaction per branch: children are archived before their
//! parents are deleted, the per-entity counts land in `archive_runs.details`,
//! and branch admins get a summary notification — all of it commits or none
//! of it does. The `ARCHIVE_SCHEDULER` advisory lock serializes scheduled
//! and manual runs process-wide.

use chrono::{DateTime, Months, Utc};
use shared::error::{AppError, ErrorCode};
use shared::models::{ArchiveRun, ArchiveRunStatus, ArchiveRunType, ArchiveSettings};
use sqlx::PgPool;

use crate::db::{self, actors, archive as archive_db, lock_keys, notifications};
use crate::error::{ServiceError, ServiceResult};

/// The hot-path cutoff: rows strictly older than this are moved.
pub fn compute_cutoff(now: DateTime<Utc>, retention_months: i32) -> DateTime<Utc> {
    now.checked_sub_months(Months::new(retention_months.max(0) as u32))
        .unwrap_or(now)
}

/// Exact-match check for the manual-run confirmation phrase.
pub fn check_confirmation(expected: &str, supplied: &str) -> Result<(), AppError> {
    if expected != supplied {
        return Err(AppError::new(ErrorCode::ArchiveConfirmationMismatch));
    }
    Ok(())
}

/// Archive one branch. Caller holds the advisory lock.
async fn archive_branch(
    pool: &PgPool,
    settings: &ArchiveSettings,
    run_type: ArchiveRunType,
    triggered_by_actor_id: Option<i64>,
) -> ServiceResult<ArchiveRun> {
    let branch_id = settings.branch_id;
    let cutoff_at = compute_cutoff(Utc::now(), settings.retention_months);

    let result = async {
        let mut tx = db::begin_with_retry(pool).await?;

        let (batches, batch_items) = archive_db::move_batches(&mut tx, branch_id, cutoff_at).await?;
        let (sales, sale_items) = archive_db::move_sales(&mut tx, branch_id, cutoff_at).await?;
        let movements = archive_db::move_movements(&mut tx, branch_id, cutoff_at).await?;
        let kpi_events = archive_db::move_kpi_events(&mut tx, branch_id, cutoff_at).await?;
        let expenses = archive_db::move_expenses(&mut tx, branch_id, cutoff_at).await?;
        let staff_payments = archive_db::move_staff_payments(&mut tx, branch_id, cutoff_at).await?;

        let details = serde_json::json!({
            "batches": batches,
            "batch_items": batch_items,
            "sales": sales,
            "sale_items": sale_items,
            "inventory_movements": movements,
            "kpi_events": kpi_events,
            "expenses": expenses,
            "staff_payments": staff_payments,
        });
        let total = batches + batch_items + sales + sale_items + movements + kpi_events
            + expenses
            + staff_payments;

        archive_db::touch_last_run(&mut tx, branch_id).await?;
        let run = archive_db::insert_run(
            &mut *tx,
            branch_id,
            triggered_by_actor_id,
            run_type,
            ArchiveRunStatus::Success,
            cutoff_at,
            details,
            None,
        )
        .await?;

        let admins = actors::branch_admins(&mut tx, branch_id).await?;
        let message = format!(
            "Archived {total} rows older than {} ({batches} batches, {sales} sales, {movements} movements)",
            cutoff_at.format("%Y-%m-%d")
        );
        for admin in admins {
            notifications::insert(
                &mut *tx,
                admin,
                branch_id,
                "Archive run complete",
                &message,
                "archive_run",
            )
            .await?;
        }

        tx.commit().await?;
        Ok::<ArchiveRun, ServiceError>(run)
    }
    .await;

    match result {
        Ok(run) => {
            tracing::info!(branch_id, run_id = run.id, "Archive run succeeded");
            Ok(run)
        }
        Err(err) => {
            let message = match &err {
                ServiceError::App(e) => e.message.clone(),
                ServiceError::Db(e) => e.to_string(),
            };
            tracing::error!(branch_id, error = %message, "Archive run failed");
            // Best effort: the failure record must not mask the original error
            let _ = archive_db::insert_run(
                pool,
                branch_id,
                triggered_by_actor_id,
                run_type,
                ArchiveRunStatus::Failed,
                cutoff_at,
                serde_json::json!({}),
                Some(&message),
            )
            .await;
            Err(err)
        }
    }
}

/// Manual run for one branch. Verifies the confirmation phrase, takes the
/// advisory lock, and refuses to run concurrently with any other run.
pub async fn manual_run(
    pool: &PgPool,
    branch_id: i64,
    actor_id: i64,
    confirmation_phrase: &str,
) -> ServiceResult<ArchiveRun> {
    let settings = archive_db::ensure_settings(pool, branch_id).await?;
    if !settings.enabled {
        return Err(AppError::new(ErrorCode::ArchiveDisabled).into());
    }
    check_confirmation(&settings.confirmation_phrase, confirmation_phrase)?;

    let mut lock_conn = pool.acquire().await?;
    if !db::try_advisory_lock(&mut *lock_conn, lock_keys::ARCHIVE_SCHEDULER).await? {
        let run = archive_db::insert_run(
            pool,
            branch_id,
            Some(actor_id),
            ArchiveRunType::Manual,
            ArchiveRunStatus::Skipped,
            compute_cutoff(Utc::now(), settings.retention_months),
            serde_json::json!({}),
            Some("archive run already in progress"),
        )
        .await?;
        tracing::warn!(branch_id, run_id = run.id, "Manual archive run skipped, lock busy");
        return Err(AppError::new(ErrorCode::ArchiveInProgress).into());
    }

    let result = archive_branch(pool, &settings, ArchiveRunType::Manual, Some(actor_id)).await;
    let _ = db::advisory_unlock(&mut *lock_conn, lock_keys::ARCHIVE_SCHEDULER).await;
    result
}

/// Scheduled sweep over every active branch with archival enabled. Holds
/// the advisory lock for the whole sweep; a concurrent holder makes this a
/// no-op.
pub async fn scheduled_sweep(pool: &PgPool) -> ServiceResult<()> {
    let mut lock_conn = pool.acquire().await?;
    if !db::try_advisory_lock(&mut *lock_conn, lock_keys::ARCHIVE_SCHEDULER).await? {
        tracing::info!("Archive sweep skipped, another run holds the lock");
        return Ok(());
    }

    let sweep = async {
        let all_settings = archive_db::settings_for_active_branches(pool).await?;
        for settings in all_settings.iter().filter(|s| s.enabled) {
            // A failing branch must not stop the rest of the sweep
            if let Err(e) = archive_branch(pool, settings, ArchiveRunType::Scheduled, None).await {
                let app: AppError = e.into();
                tracing::error!(
                    branch_id = settings.branch_id,
                    error = %app.message,
                    "Scheduled archive failed for branch"
                );
            }
        }
        Ok::<(), ServiceError>(())
    }
    .await;

    let _ = db::advisory_unlock(&mut *lock_conn, lock_keys::ARCHIVE_SCHEDULER).await;
    sweep
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_cutoff_subtracts_months() {
        let now = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap();
        let cutoff = compute_cutoff(now, 6);
        assert_eq!(cutoff, Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_cutoff_clamps_to_month_end() {
        // 2026-03-31 minus one month lands on 2026-02-28
        let now = Utc.with_ymd_and_hms(2026, 3, 31, 0, 0, 0).unwrap();
        let cutoff = compute_cutoff(now, 1);
        assert_eq!(cutoff, Utc.with_ymd_and_hms(2026, 2, 28, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_confirmation_is_exact() {
        assert!(check_confirmation("archive it all", "archive it all").is_ok());

        let err = check_confirmation("archive it all", "Archive it all").unwrap_err();
        assert_eq!(err.code, ErrorCode::ArchiveConfirmationMismatch);

        let err = check_confirmation("archive it all", "archive it all ").unwrap_err();
        assert_eq!(err.code, ErrorCode::ArchiveConfirmationMismatch);
    }
}
