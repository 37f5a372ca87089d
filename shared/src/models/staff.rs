//! Staff profile (HR record) model

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Role a profile is expected to hold if an account is created for it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(
    feature = "db",
    sqlx(type_name = "role_preference", rename_all = "snake_case")
)]
pub enum RolePreference {
    Cashier,
    Manager,
    Other,
}

/// HR record; may or may not be linked to a login [`Actor`](super::Actor)
///
/// Invariant: a profile is linked to at most one active actor and vice versa.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct StaffProfile {
    pub id: i64,
    pub full_name: String,
    pub phone_number: String,
    pub national_id: Option<String>,
    pub age: Option<i32>,
    pub monthly_salary: Decimal,
    pub role_preference: RolePreference,
    pub job_title: Option<String>,
    pub branch_id: i64,
    pub linked_actor_id: Option<i64>,
    pub is_active: bool,
    pub hire_date: Option<NaiveDate>,
    pub termination_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// Create staff profile payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffProfileCreate {
    pub full_name: String,
    pub phone_number: String,
    pub national_id: Option<String>,
    pub age: Option<i32>,
    pub monthly_salary: Decimal,
    pub role_preference: RolePreference,
    pub job_title: Option<String>,
    pub branch_id: i64,
    pub hire_date: Option<NaiveDate>,
}

/// Update staff profile payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffProfileUpdate {
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub national_id: Option<String>,
    pub age: Option<i32>,
    pub monthly_salary: Option<Decimal>,
    pub role_preference: Option<RolePreference>,
    pub job_title: Option<String>,
}

/// Create-account-for-profile payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffAccountCreate {
    pub staff_profile_id: i64,
    pub username: String,
    pub password: String,
    pub role: super::Role,
    pub branch_id: i64,
}
