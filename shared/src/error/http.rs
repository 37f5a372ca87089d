//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            // 401 Unauthorized
            Self::AuthRequired
            | Self::InvalidCredentials
            | Self::AccountDisabled
            | Self::TokenExpired
            | Self::TokenInvalid => StatusCode::UNAUTHORIZED,

            // 403 Forbidden
            Self::AuthForbidden => StatusCode::FORBIDDEN,

            // 400 Bad Request
            Self::ValidationFailed
            | Self::IdempotencyKeyTooLong
            | Self::ProductUnavailable
            | Self::StaffAlreadyLinked
            | Self::ArchiveConfirmationMismatch
            | Self::ArchiveDisabled => StatusCode::BAD_REQUEST,

            // 409 Conflict
            Self::IdempotencyEndpointMismatch
            | Self::ReceiptCollision
            | Self::AccountAlreadyExists
            | Self::InsufficientStock
            | Self::BatchLocked
            | Self::BatchVoided
            | Self::SaleAlreadyVoided
            | Self::ArchiveInProgress => StatusCode::CONFLICT,

            // 404 Not Found
            Self::NotFound => StatusCode::NOT_FOUND,

            // 503 Service Unavailable (transient, client can retry)
            Self::DbTransient => StatusCode::SERVICE_UNAVAILABLE,

            // 429 Too Many Requests
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,

            // 500 Internal Server Error
            Self::InternalError | Self::ConfigError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_statuses() {
        assert_eq!(
            ErrorCode::AuthRequired.http_status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ErrorCode::AuthForbidden.http_status(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_validation_statuses() {
        assert_eq!(
            ErrorCode::ValidationFailed.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorCode::ProductUnavailable.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorCode::StaffAlreadyLinked.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorCode::ArchiveConfirmationMismatch.http_status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_conflict_statuses() {
        assert_eq!(
            ErrorCode::InsufficientStock.http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(ErrorCode::BatchLocked.http_status(), StatusCode::CONFLICT);
        assert_eq!(
            ErrorCode::IdempotencyEndpointMismatch.http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ErrorCode::AccountAlreadyExists.http_status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_remaining_statuses() {
        assert_eq!(ErrorCode::NotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ErrorCode::DbTransient.http_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ErrorCode::RateLimited.http_status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ErrorCode::InternalError.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
