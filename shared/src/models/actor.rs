//! Actor (authenticated principal) model

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Actor role; determines authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "actor_role", rename_all = "snake_case"))]
pub enum Role {
    Admin,
    Manager,
    Cashier,
}

impl Role {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Cashier => "cashier",
        }
    }
}

/// Authenticated principal
///
/// `branch_id` is the home branch; the `actor_branches` mapping permits
/// multi-branch access on top of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Actor {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub branch_id: Option<i64>,
    pub is_active: bool,
    pub hire_date: Option<NaiveDate>,
    pub termination_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// Actor as exposed on read APIs (no credential material)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorView {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub branch_id: Option<i64>,
    pub is_active: bool,
}

impl From<&Actor> for ActorView {
    fn from(a: &Actor) -> Self {
        Self {
            id: a.id,
            username: a.username.clone(),
            email: a.email.clone(),
            role: a.role,
            branch_id: a.branch_id,
            is_active: a.is_active,
        }
    }
}

/// Update account payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub branch_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serde() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        assert_eq!(
            serde_json::from_str::<Role>("\"cashier\"").unwrap(),
            Role::Cashier
        );
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let actor = Actor {
            id: 1,
            username: "amira".into(),
            email: "amira@example.com".into(),
            password_hash: "secret".into(),
            role: Role::Manager,
            branch_id: Some(2),
            is_active: true,
            hire_date: None,
            termination_date: None,
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&actor).unwrap();
        assert!(!json.contains("secret"));
        assert!(!json.contains("password_hash"));
    }
}
