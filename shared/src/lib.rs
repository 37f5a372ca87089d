//! Shared types for the Crust bakery-operations platform
//!
//! Common types used by both the authoritative server and the terminal
//! client: domain models, request/response payloads, the unified error
//! system, and wire-level constants.

pub mod error;
pub mod headers;
pub mod models;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

// Unified error system re-exports
pub use error::{AppError, AppResult, ErrorBody, ErrorCategory, ErrorCode};
