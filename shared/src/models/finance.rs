//! Branch-scoped financial ledger rows: expenses and staff payments

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Branch expense
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Expense {
    pub id: i64,
    pub branch_id: i64,
    pub amount: Decimal,
    pub expense_date: NaiveDate,
    pub category: String,
    pub description: Option<String>,
    pub created_by_actor_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Create expense payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseCreate {
    pub amount: Decimal,
    pub expense_date: NaiveDate,
    pub category: String,
    pub description: Option<String>,
}

/// Update expense payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseUpdate {
    pub amount: Option<Decimal>,
    pub expense_date: Option<NaiveDate>,
    pub category: Option<String>,
    pub description: Option<String>,
}

/// Payroll payment to a staff profile
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct StaffPayment {
    pub id: i64,
    pub branch_id: i64,
    pub staff_profile_id: i64,
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub payment_type: String,
    pub notes: Option<String>,
    pub created_by_actor_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Create staff payment payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffPaymentCreate {
    pub staff_profile_id: i64,
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub payment_type: String,
    pub notes: Option<String>,
}
