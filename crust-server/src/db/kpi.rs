//! KPI / domain event log (append-only)

use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction};

use crate::error::ServiceResult;

/// Append one event inside the caller's transaction.
pub async fn insert_event(
    tx: &mut Transaction<'_, Postgres>,
    branch_id: i64,
    actor_id: i64,
    event_type: &str,
    metric_key: Option<&str>,
    event_value: Decimal,
    duration_ms: Option<i64>,
    metadata: Option<serde_json::Value>,
) -> ServiceResult<()> {
    sqlx::query(
        r#"
        INSERT INTO kpi_events
            (branch_id, actor_id, event_type, metric_key, event_value, duration_ms, metadata)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(branch_id)
    .bind(actor_id)
    .bind(event_type)
    .bind(metric_key)
    .bind(event_value)
    .bind(duration_ms)
    .bind(metadata)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
