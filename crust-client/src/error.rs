//! Client error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("API error {status}: {message}")]
    Api {
        status: u16,
        /// Stable string code from the error envelope
        code: String,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Queue storage error: {0}")]
    Storage(#[from] crate::queue::storage::StorageError),

    #[error("Operation {0} depends on an operation that has not synced yet")]
    DependencyPending(uuid::Uuid),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::Network(e.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::InvalidResponse(e.to_string())
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
