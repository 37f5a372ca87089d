//! Notifications and alert rules

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Rule matched against domain events; `branch_id = NULL` applies everywhere
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct AlertRule {
    pub id: i64,
    pub branch_id: Option<i64>,
    /// `high_sale` or `low_stock`
    pub event_type: String,
    pub threshold: Decimal,
    pub enabled: bool,
}

/// Create alert rule payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRuleCreate {
    pub branch_id: Option<i64>,
    pub event_type: String,
    pub threshold: Decimal,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Update alert rule payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRuleUpdate {
    pub threshold: Option<Decimal>,
    pub enabled: Option<bool>,
}

/// Notification delivered to one actor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Notification {
    pub id: i64,
    pub recipient_actor_id: i64,
    pub branch_id: i64,
    pub title: String,
    pub message: String,
    pub notification_type: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
