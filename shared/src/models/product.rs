//! Product catalog models (global across branches)

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Product category
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub is_active: bool,
}

/// Catalog product
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub category_id: i64,
    /// Selling price per unit
    pub price: Decimal,
    /// Production/purchase cost per unit
    pub cost: Option<Decimal>,
    /// Sale unit ("piece", "kg", ...)
    pub unit: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Create product payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCreate {
    pub name: String,
    pub category_id: i64,
    pub price: Decimal,
    pub cost: Option<Decimal>,
    pub unit: Option<String>,
}

/// Update product payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub category_id: Option<i64>,
    pub price: Option<Decimal>,
    pub cost: Option<Decimal>,
    pub unit: Option<String>,
    pub is_active: Option<bool>,
}
