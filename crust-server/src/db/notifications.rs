//! Notifications and alert rules

use shared::error::AppError;
use shared::models::notification::{AlertRuleCreate, AlertRuleUpdate};
use shared::models::{AlertRule, Notification};
use sqlx::{PgPool, Postgres, Transaction};

use crate::error::ServiceResult;

/// Insert one notification. Rule-triggered notifications run inside the
/// handler's transaction: if this insert fails, the surrounding domain
/// event fails with it.
pub async fn insert<'e, E>(
    executor: E,
    recipient_actor_id: i64,
    branch_id: i64,
    title: &str,
    message: &str,
    notification_type: &str,
) -> ServiceResult<()>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    sqlx::query(
        r#"
        INSERT INTO notifications (recipient_actor_id, branch_id, title, message, notification_type)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(recipient_actor_id)
    .bind(branch_id)
    .bind(title)
    .bind(message)
    .bind(notification_type)
    .execute(executor)
    .await?;
    Ok(())
}

/// Enabled rules matching an event type for a branch (branch-specific rules
/// plus global ones).
pub async fn matching_rules(
    tx: &mut Transaction<'_, Postgres>,
    branch_id: i64,
    event_type: &str,
) -> ServiceResult<Vec<AlertRule>> {
    Ok(sqlx::query_as(
        r#"
        SELECT * FROM alert_rules
        WHERE enabled AND event_type = $2
          AND (branch_id IS NULL OR branch_id = $1)
        "#,
    )
    .bind(branch_id)
    .bind(event_type)
    .fetch_all(&mut **tx)
    .await?)
}

pub async fn list_for_actor(
    pool: &PgPool,
    actor_id: i64,
    unread_only: bool,
    limit: i64,
) -> ServiceResult<Vec<Notification>> {
    Ok(sqlx::query_as(
        r#"
        SELECT * FROM notifications
        WHERE recipient_actor_id = $1 AND (NOT $2 OR NOT is_read)
        ORDER BY created_at DESC
        LIMIT $3
        "#,
    )
    .bind(actor_id)
    .bind(unread_only)
    .bind(limit)
    .fetch_all(pool)
    .await?)
}

pub async fn mark_read(pool: &PgPool, actor_id: i64, notification_id: i64) -> ServiceResult<()> {
    let result = sqlx::query(
        "UPDATE notifications SET is_read = TRUE WHERE id = $1 AND recipient_actor_id = $2",
    )
    .bind(notification_id)
    .bind(actor_id)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Notification").into());
    }
    Ok(())
}

pub async fn list_rules(pool: &PgPool) -> ServiceResult<Vec<AlertRule>> {
    Ok(sqlx::query_as("SELECT * FROM alert_rules ORDER BY id")
        .fetch_all(pool)
        .await?)
}

pub async fn create_rule(pool: &PgPool, data: &AlertRuleCreate) -> ServiceResult<AlertRule> {
    Ok(sqlx::query_as(
        r#"
        INSERT INTO alert_rules (branch_id, event_type, threshold, enabled)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(data.branch_id)
    .bind(&data.event_type)
    .bind(data.threshold)
    .bind(data.enabled)
    .fetch_one(pool)
    .await?)
}

pub async fn update_rule(
    pool: &PgPool,
    rule_id: i64,
    data: &AlertRuleUpdate,
) -> ServiceResult<AlertRule> {
    let rule: Option<AlertRule> = sqlx::query_as(
        r#"
        UPDATE alert_rules SET
            threshold = COALESCE($2, threshold),
            enabled = COALESCE($3, enabled)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(rule_id)
    .bind(data.threshold)
    .bind(data.enabled)
    .fetch_optional(pool)
    .await?;
    rule.ok_or_else(|| AppError::not_found("Alert rule").into())
}

pub async fn delete_rule(pool: &PgPool, rule_id: i64) -> ServiceResult<()> {
    let result = sqlx::query("DELETE FROM alert_rules WHERE id = $1")
        .bind(rule_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Alert rule").into());
    }
    Ok(())
}
