//! Inventory ledger models
//!
//! `StockLevel` is never mutated directly; it is always the side effect of a
//! ledger movement, and its quantity equals the sum of `quantity_change`
//! over all matching movements.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of ledger movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(
    feature = "db",
    sqlx(type_name = "movement_type", rename_all = "snake_case")
)]
pub enum MovementType {
    BatchIn,
    SaleOut,
    VoidOut,
    ManualAdjustment,
}

/// Where a unit of stock came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(
    feature = "db",
    sqlx(type_name = "stock_source", rename_all = "snake_case")
)]
pub enum StockSource {
    Baked,
    Purchased,
}

/// Current stock for one `(branch, product)` pair
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct StockLevel {
    pub branch_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    /// Source of the most recent movement for this pair
    pub source: StockSource,
    pub last_updated: DateTime<Utc>,
}

/// One append-only row in the inventory ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct InventoryMovement {
    pub id: i64,
    pub branch_id: i64,
    pub product_id: i64,
    pub movement_type: MovementType,
    /// Signed change; negative for sale/void deductions
    pub quantity_change: i32,
    pub source: StockSource,
    /// Referencing aggregate kind ("batch", "sale", "adjustment")
    pub reference_type: String,
    pub reference_id: Option<i64>,
    pub actor_id: i64,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Manual stock adjustment payload (`PUT /inventory/:product_id`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockAdjustment {
    /// Desired absolute quantity after the adjustment
    pub quantity: i32,
    pub source: Option<StockSource>,
    pub reason: Option<String>,
}
