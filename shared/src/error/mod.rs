//! Unified error system for the Crust platform
//!
//! - [`ErrorCode`]: stable string codes shared with clients
//! - [`ErrorCategory`]: classification of errors by kind
//! - [`AppError`]: rich error type with code, message, and details
//! - [`ErrorBody`]: the JSON error envelope every endpoint returns
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCode};
//!
//! // Create a simple error
//! let err = AppError::new(ErrorCode::NotFound);
//!
//! // Create an error with custom message and details
//! let err = AppError::with_message(ErrorCode::ValidationFailed, "quantity must be positive")
//!     .with_detail("field", "quantity");
//! ```

mod category;
mod codes;
mod http;
mod types;

pub use category::ErrorCategory;
pub use codes::ErrorCode;
pub use types::{AppError, AppResult, ErrorBody};
