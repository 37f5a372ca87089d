//! KPI / domain event log

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Well-known event type names written by the write paths
pub mod event_types {
    pub const SALE_COMPLETED: &str = "sale_completed";
    pub const SALE_VOIDED: &str = "sale_voided";
    pub const CASHIER_ORDER_DURATION: &str = "cashier_order_duration";
    pub const BATCH_CREATED: &str = "batch_created";
    pub const HIGH_SALE: &str = "high_sale";
    pub const LOW_STOCK: &str = "low_stock";
}

/// Append-only domain event row
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct KpiEvent {
    pub id: i64,
    pub branch_id: i64,
    pub actor_id: i64,
    pub event_type: String,
    pub metric_key: Option<String>,
    pub event_value: Decimal,
    pub duration_ms: Option<i64>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}
