//! Error types and the JSON error envelope

use super::category::ErrorCategory;
use super::codes::ErrorCode;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Application error with structured error code and details
///
/// The primary error type for the platform:
/// - Standardized string codes via [`ErrorCode`]
/// - Human-readable messages
/// - Optional structured details (field errors, stock context, etc.)
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AppError {
    /// The error code identifying the type of error
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    pub details: Option<HashMap<String, Value>>,
}

impl AppError {
    /// Create a new error with the default message for the error code
    pub fn new(code: ErrorCode) -> Self {
        Self {
            message: code.message().to_string(),
            code,
            details: None,
        }
    }

    /// Create a new error with a custom message
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Add a detail entry to this error
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Get the HTTP status code for this error
    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    // ==================== Convenience constructors ====================

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::ValidationFailed, msg)
    }

    /// Create a not found error
    pub fn not_found(resource: impl Into<String>) -> Self {
        let r = resource.into();
        Self::with_message(ErrorCode::NotFound, format!("{} not found", r))
            .with_detail("resource", r)
    }

    /// Create an authentication-required error
    pub fn unauthorized() -> Self {
        Self::new(ErrorCode::AuthRequired)
    }

    /// Create a forbidden error
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::AuthForbidden, msg)
    }

    /// Create an invalid credentials error
    pub fn invalid_credentials() -> Self {
        Self::new(ErrorCode::InvalidCredentials)
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InternalError, msg)
    }

    /// Create a transient database error
    pub fn db_transient() -> Self {
        Self::new(ErrorCode::DbTransient)
    }

    /// Create an insufficient-stock error carrying the standard context
    pub fn insufficient_stock(product_id: i64, current: i32, requested: i32) -> Self {
        Self::new(ErrorCode::InsufficientStock)
            .with_detail("product_id", product_id)
            .with_detail("current", current)
            .with_detail("requested", requested)
    }
}

/// JSON error envelope returned by every failing endpoint
///
/// `{error, code, details?, requestId}` — `request_id` is filled in by the
/// server's envelope layer from the `x-request-id` header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable message
    pub error: String,
    /// Stable string code
    pub code: ErrorCode,
    /// Additional structured context
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Value>>,
    /// Request correlation id
    #[serde(rename = "requestId", skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl From<&AppError> for ErrorBody {
    fn from(err: &AppError) -> Self {
        Self {
            error: err.message.clone(),
            code: err.code,
            details: err.details.clone(),
            request_id: None,
        }
    }
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

// ===== Axum Integration =====

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::Json;

        let status = self.http_status();
        let body = ErrorBody::from(&self);

        if matches!(self.code.category(), ErrorCategory::System) {
            tracing::error!(
                code = %self.code,
                message = %self.message,
                "System error occurred"
            );
        }

        let mut response = (status, Json(body)).into_response();
        if self.code == ErrorCode::DbTransient {
            response
                .headers_mut()
                .insert(http::header::RETRY_AFTER, http::HeaderValue::from_static("1"));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_new() {
        let err = AppError::new(ErrorCode::NotFound);
        assert_eq!(err.code, ErrorCode::NotFound);
        assert_eq!(err.message, "Resource not found");
        assert!(err.details.is_none());
    }

    #[test]
    fn test_app_error_with_detail() {
        let err = AppError::validation("Missing required fields")
            .with_detail("field", "items")
            .with_detail("reason", "required");

        assert_eq!(err.code, ErrorCode::ValidationFailed);
        let details = err.details.unwrap();
        assert_eq!(details.get("field").unwrap(), "items");
        assert_eq!(details.get("reason").unwrap(), "required");
    }

    #[test]
    fn test_insufficient_stock_details() {
        let err = AppError::insufficient_stock(42, 7, 99);
        let details = err.details.unwrap();
        assert_eq!(details.get("product_id").unwrap(), 42);
        assert_eq!(details.get("current").unwrap(), 7);
        assert_eq!(details.get("requested").unwrap(), 99);
    }

    #[test]
    fn test_envelope_shape() {
        let err = AppError::new(ErrorCode::BatchLocked);
        let body = ErrorBody::from(&err);
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["code"], "BATCH_LOCKED");
        assert_eq!(json["error"], "Batch can no longer be edited");
        // Absent fields are omitted, not null
        assert!(json.get("details").is_none());
        assert!(json.get("requestId").is_none());
    }

    #[test]
    fn test_envelope_request_id_rename() {
        let mut body = ErrorBody::from(&AppError::new(ErrorCode::NotFound));
        body.request_id = Some("req-1".into());
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["requestId"], "req-1");
    }

    #[test]
    fn test_envelope_roundtrip() {
        let body = ErrorBody::from(&AppError::insufficient_stock(1, 0, 3));
        let json = serde_json::to_string(&body).unwrap();
        let parsed: ErrorBody = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.code, ErrorCode::InsufficientStock);
        assert_eq!(parsed.details.unwrap().get("requested").unwrap(), 3);
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::with_message(ErrorCode::NotFound, "Batch not found");
        assert_eq!(format!("{}", err), "Batch not found");
    }
}
