//! Error category classification

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

/// Error category classification
///
/// Mirrors the error taxonomy: authentication, validation, conflict,
/// not-found, transient, rate-limit, and system errors. The category drives
/// server-side logging (system errors are logged at error level) and client
/// retry policy (transient errors are retried, conflicts are surfaced for
/// admin review).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Auth,
    Validation,
    Conflict,
    NotFound,
    Transient,
    RateLimit,
    System,
}

impl ErrorCode {
    /// Classify this code
    pub const fn category(&self) -> ErrorCategory {
        match self {
            ErrorCode::AuthRequired
            | ErrorCode::AuthForbidden
            | ErrorCode::InvalidCredentials
            | ErrorCode::AccountDisabled
            | ErrorCode::TokenExpired
            | ErrorCode::TokenInvalid => ErrorCategory::Auth,

            ErrorCode::ValidationFailed
            | ErrorCode::IdempotencyKeyTooLong
            | ErrorCode::ProductUnavailable
            | ErrorCode::StaffAlreadyLinked
            | ErrorCode::ArchiveConfirmationMismatch
            | ErrorCode::ArchiveDisabled => ErrorCategory::Validation,

            ErrorCode::IdempotencyEndpointMismatch
            | ErrorCode::ReceiptCollision
            | ErrorCode::AccountAlreadyExists
            | ErrorCode::InsufficientStock
            | ErrorCode::BatchLocked
            | ErrorCode::BatchVoided
            | ErrorCode::SaleAlreadyVoided
            | ErrorCode::ArchiveInProgress => ErrorCategory::Conflict,

            ErrorCode::NotFound => ErrorCategory::NotFound,

            ErrorCode::DbTransient => ErrorCategory::Transient,

            ErrorCode::RateLimited => ErrorCategory::RateLimit,

            ErrorCode::InternalError | ErrorCode::ConfigError => ErrorCategory::System,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(ErrorCode::AuthRequired.category(), ErrorCategory::Auth);
        assert_eq!(
            ErrorCode::ValidationFailed.category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            ErrorCode::InsufficientStock.category(),
            ErrorCategory::Conflict
        );
        assert_eq!(ErrorCode::NotFound.category(), ErrorCategory::NotFound);
        assert_eq!(ErrorCode::DbTransient.category(), ErrorCategory::Transient);
        assert_eq!(ErrorCode::RateLimited.category(), ErrorCategory::RateLimit);
        assert_eq!(ErrorCode::InternalError.category(), ErrorCategory::System);
    }
}
