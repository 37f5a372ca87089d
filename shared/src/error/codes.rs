//! Unified error codes for the Crust platform
//!
//! Codes are stable string identifiers shared by the server, the terminal
//! client, and the offline queue's conflict classifier. They serialize as
//! SCREAMING_SNAKE_CASE strings so replayed responses compare bit-for-bit.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// Grouped by concern: authentication, validation, conflict, domain,
/// not-found, transient, rate limiting, and system errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ==================== Authentication ====================
    /// No usable credentials on the request
    AuthRequired,
    /// Authenticated but not allowed to perform the action
    AuthForbidden,
    /// Username/password pair rejected
    InvalidCredentials,
    /// Account exists but is deactivated
    AccountDisabled,
    /// Bearer token expired
    TokenExpired,
    /// Bearer token malformed or signature mismatch
    TokenInvalid,

    // ==================== Validation ====================
    /// Payload failed validation; details carry per-field errors
    ValidationFailed,
    /// Idempotency key exceeds the 120-character limit
    IdempotencyKeyTooLong,
    /// Product unknown or inactive at sale time
    ProductUnavailable,
    /// Staff profile is already linked to an account
    StaffAlreadyLinked,
    /// Manual archive run confirmation phrase did not match
    ArchiveConfirmationMismatch,
    /// Archival is disabled for the branch
    ArchiveDisabled,

    // ==================== Conflict ====================
    /// Same (actor, key) replayed against a different endpoint
    IdempotencyEndpointMismatch,
    /// Receipt number collided; retried internally before surfacing
    ReceiptCollision,
    /// An active account with the same identity already exists
    AccountAlreadyExists,
    /// A movement would drive stock below zero
    InsufficientStock,
    /// Batch outside its edit window or not editable by this actor
    BatchLocked,
    /// Batch has already been voided
    BatchVoided,
    /// Sale has already been voided
    SaleAlreadyVoided,
    /// An archive run is already in progress
    ArchiveInProgress,

    // ==================== Not found ====================
    /// Resource not found
    NotFound,

    // ==================== Transient ====================
    /// Database connection lost or timed out; retry with backoff
    DbTransient,

    // ==================== Rate limit ====================
    /// Too many requests from this client
    RateLimited,

    // ==================== System ====================
    /// Internal server error
    InternalError,
    /// Service misconfigured
    ConfigError,
}

impl ErrorCode {
    /// Stable wire representation of this code
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::AuthRequired => "AUTH_REQUIRED",
            ErrorCode::AuthForbidden => "AUTH_FORBIDDEN",
            ErrorCode::InvalidCredentials => "INVALID_CREDENTIALS",
            ErrorCode::AccountDisabled => "ACCOUNT_DISABLED",
            ErrorCode::TokenExpired => "TOKEN_EXPIRED",
            ErrorCode::TokenInvalid => "TOKEN_INVALID",
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::IdempotencyKeyTooLong => "IDEMPOTENCY_KEY_TOO_LONG",
            ErrorCode::ProductUnavailable => "PRODUCT_UNAVAILABLE",
            ErrorCode::StaffAlreadyLinked => "STAFF_ALREADY_LINKED",
            ErrorCode::ArchiveConfirmationMismatch => "ARCHIVE_CONFIRMATION_MISMATCH",
            ErrorCode::ArchiveDisabled => "ARCHIVE_DISABLED",
            ErrorCode::IdempotencyEndpointMismatch => "IDEMPOTENCY_ENDPOINT_MISMATCH",
            ErrorCode::ReceiptCollision => "RECEIPT_COLLISION",
            ErrorCode::AccountAlreadyExists => "ACCOUNT_ALREADY_EXISTS",
            ErrorCode::InsufficientStock => "INSUFFICIENT_STOCK",
            ErrorCode::BatchLocked => "BATCH_LOCKED",
            ErrorCode::BatchVoided => "BATCH_VOIDED",
            ErrorCode::SaleAlreadyVoided => "SALE_ALREADY_VOIDED",
            ErrorCode::ArchiveInProgress => "ARCHIVE_IN_PROGRESS",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::DbTransient => "DB_TRANSIENT",
            ErrorCode::RateLimited => "RATE_LIMITED",
            ErrorCode::InternalError => "INTERNAL_ERROR",
            ErrorCode::ConfigError => "CONFIG_ERROR",
        }
    }

    /// Developer-facing default message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            ErrorCode::AuthRequired => "Authentication required",
            ErrorCode::AuthForbidden => "Not allowed to perform this action",
            ErrorCode::InvalidCredentials => "Invalid username or password",
            ErrorCode::AccountDisabled => "Account is disabled",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::TokenInvalid => "Authentication token is invalid",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::IdempotencyKeyTooLong => "Idempotency key exceeds 120 characters",
            ErrorCode::ProductUnavailable => "Product is unknown or inactive",
            ErrorCode::StaffAlreadyLinked => "Staff profile is already linked to an account",
            ErrorCode::ArchiveConfirmationMismatch => "Archive confirmation phrase does not match",
            ErrorCode::ArchiveDisabled => "Archival is disabled for this branch",
            ErrorCode::IdempotencyEndpointMismatch => {
                "Idempotency key was first used against a different endpoint"
            }
            ErrorCode::ReceiptCollision => "Receipt number collision",
            ErrorCode::AccountAlreadyExists => "An active account with this identity exists",
            ErrorCode::InsufficientStock => "Insufficient stock",
            ErrorCode::BatchLocked => "Batch can no longer be edited",
            ErrorCode::BatchVoided => "Batch has already been voided",
            ErrorCode::SaleAlreadyVoided => "Sale has already been voided",
            ErrorCode::ArchiveInProgress => "An archive run is already in progress",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::DbTransient => "Database temporarily unavailable, retry later",
            ErrorCode::RateLimited => "Too many requests, try again later",
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::ConfigError => "Service configuration error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_as_string() {
        let json = serde_json::to_string(&ErrorCode::InsufficientStock).unwrap();
        assert_eq!(json, "\"INSUFFICIENT_STOCK\"");

        let json = serde_json::to_string(&ErrorCode::IdempotencyEndpointMismatch).unwrap();
        assert_eq!(json, "\"IDEMPOTENCY_ENDPOINT_MISMATCH\"");

        let json = serde_json::to_string(&ErrorCode::DbTransient).unwrap();
        assert_eq!(json, "\"DB_TRANSIENT\"");
    }

    #[test]
    fn test_roundtrip() {
        let codes = [
            ErrorCode::AuthRequired,
            ErrorCode::ValidationFailed,
            ErrorCode::InsufficientStock,
            ErrorCode::BatchLocked,
            ErrorCode::ArchiveConfirmationMismatch,
            ErrorCode::InternalError,
        ];

        for code in codes {
            let json = serde_json::to_string(&code).unwrap();
            let parsed: ErrorCode = serde_json::from_str(&json).unwrap();
            assert_eq!(code, parsed);
        }
    }

    #[test]
    fn test_as_str_matches_serde() {
        for code in [
            ErrorCode::ProductUnavailable,
            ErrorCode::StaffAlreadyLinked,
            ErrorCode::AccountAlreadyExists,
            ErrorCode::RateLimited,
        ] {
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{}\"", code.as_str()));
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", ErrorCode::NotFound), "NOT_FOUND");
        assert_eq!(format!("{}", ErrorCode::BatchLocked), "BATCH_LOCKED");
    }

    #[test]
    fn test_deserialize_unknown_fails() {
        let result: Result<ErrorCode, _> = serde_json::from_str("\"NO_SUCH_CODE\"");
        assert!(result.is_err());
    }
}
