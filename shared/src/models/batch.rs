//! Production batch models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::stock::StockSource;

/// Batch lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(
    feature = "db",
    sqlx(type_name = "batch_status", rename_all = "snake_case")
)]
pub enum BatchStatus {
    Pending,
    Sent,
    Received,
    Edited,
    Voided,
}

/// A production event that increases stock at a branch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Batch {
    pub id: i64,
    pub branch_id: i64,
    pub creator_actor_id: i64,
    pub batch_date: DateTime<Utc>,
    pub status: BatchStatus,
    pub notes: Option<String>,
    pub is_offline: bool,
    /// Actor who replayed the batch from an offline queue, when different
    /// from the creator
    pub synced_by_actor_id: Option<i64>,
    pub synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// One product line of a batch; unique per `(batch, product, source)`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct BatchItem {
    pub id: i64,
    pub batch_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub source: StockSource,
}

/// One desired line in a create/edit request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItemInput {
    pub product_id: i64,
    pub quantity: i32,
    pub source: StockSource,
}

/// Create batch payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchCreate {
    pub items: Vec<BatchItemInput>,
    pub notes: Option<String>,
    #[serde(default)]
    pub is_offline: bool,
    /// Original creator when replayed from an offline queue
    pub original_actor_id: Option<i64>,
}

/// Edit batch payload: the full desired set of lines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchEdit {
    pub items: Vec<BatchItemInput>,
    pub notes: Option<String>,
}

/// Batch plus its items, as returned by read APIs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchWithItems {
    #[serde(flatten)]
    pub batch: Batch,
    pub items: Vec<BatchItem>,
}
