//! Role capability matrix
//!
//! All capability checks live here, keyed on `(role, action)`. Ownership
//! rules (a manager may only modify their own batches) layer on top in the
//! batch predicate; this matrix answers only "may this role ever do this".

use shared::error::AppError;
use shared::models::Role;

/// Every privileged action the HTTP surface exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    RecordSale,
    VoidSale,
    CreateBatch,
    ModifyBatch,
    AdjustStock,
    ManageCatalog,
    ManageBranches,
    ManageStaff,
    ManageAccounts,
    ManageAlertRules,
    ManageArchive,
    RecordExpense,
    RecordStaffPayment,
}

/// The single source of truth for role capabilities.
pub fn role_allows(role: Role, action: Action) -> bool {
    use Action::*;
    match role {
        Role::Admin => true,
        Role::Manager => matches!(
            action,
            RecordSale
                | VoidSale
                | CreateBatch
                | ModifyBatch
                | AdjustStock
                | ManageCatalog
                | RecordExpense
                | RecordStaffPayment
        ),
        Role::Cashier => matches!(action, RecordSale),
    }
}

/// Fail with `AUTH_FORBIDDEN` unless the role allows the action.
pub fn require(role: Role, action: Action) -> Result<(), AppError> {
    if role_allows(role, action) {
        Ok(())
    } else {
        Err(AppError::forbidden(format!(
            "{} role may not perform this action",
            role.as_str()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_allows_everything() {
        for action in [
            Action::RecordSale,
            Action::ModifyBatch,
            Action::ManageAccounts,
            Action::ManageArchive,
            Action::ManageBranches,
        ] {
            assert!(role_allows(Role::Admin, action));
        }
    }

    #[test]
    fn test_manager_scope() {
        assert!(role_allows(Role::Manager, Action::CreateBatch));
        assert!(role_allows(Role::Manager, Action::AdjustStock));
        assert!(role_allows(Role::Manager, Action::RecordExpense));
        assert!(!role_allows(Role::Manager, Action::ManageAccounts));
        assert!(!role_allows(Role::Manager, Action::ManageArchive));
        assert!(!role_allows(Role::Manager, Action::ManageBranches));
    }

    #[test]
    fn test_cashier_scope() {
        assert!(role_allows(Role::Cashier, Action::RecordSale));
        assert!(!role_allows(Role::Cashier, Action::VoidSale));
        assert!(!role_allows(Role::Cashier, Action::CreateBatch));
        assert!(!role_allows(Role::Cashier, Action::AdjustStock));
    }

    #[test]
    fn test_require_maps_to_forbidden() {
        let err = require(Role::Cashier, Action::ManageArchive).unwrap_err();
        assert_eq!(err.code, shared::error::ErrorCode::AuthForbidden);
    }
}
