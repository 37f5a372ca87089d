//! Point-of-sale models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Accepted payment methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(
    feature = "db",
    sqlx(type_name = "payment_method", rename_all = "snake_case")
)]
pub enum PaymentMethod {
    Cash,
    Card,
    Mobile,
}

/// A committed sale; created atomically, never edited, only voided
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: i64,
    pub branch_id: i64,
    pub cashier_actor_id: i64,
    pub total_amount: Decimal,
    pub payment_method: PaymentMethod,
    pub is_offline: bool,
    pub is_voided: bool,
    pub sale_date: DateTime<Utc>,
    /// `R` + `YYYYMMDD` + 6-digit per-day sequence, globally unique
    pub receipt_number: String,
}

/// One product line of a sale
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct SaleItem {
    pub id: i64,
    pub sale_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

/// One requested line of `POST /sales`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleItemInput {
    pub product_id: i64,
    pub quantity: i32,
}

/// Create sale payload; branch and cashier come from auth context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleCreate {
    pub items: Vec<SaleItemInput>,
    pub payment_method: PaymentMethod,
    /// Time the cashier spent composing the order, for KPI tracking
    pub cashier_timing_ms: Option<i64>,
}

/// Committed-sale response; stored verbatim against the idempotency key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleReceipt {
    pub id: i64,
    pub receipt_number: String,
    pub total_amount: Decimal,
    pub items: Vec<SaleItem>,
}
