//! JWT issuing and verification

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use shared::models::Role;

/// Claims carried by every bearer token
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Actor id
    pub sub: i64,
    pub role: Role,
    /// Home branch
    pub branch_id: Option<i64>,
    /// Expiration (Unix timestamp seconds)
    pub exp: usize,
    /// Issued at (Unix timestamp seconds)
    pub iat: usize,
}

const JWT_EXPIRY_HOURS: i64 = 12;

/// Create a token for an authenticated actor
pub fn create_token(
    actor_id: i64,
    role: Role,
    branch_id: Option<i64>,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now();
    let claims = Claims {
        sub: actor_id,
        role,
        branch_id,
        exp: (now + chrono::Duration::hours(JWT_EXPIRY_HOURS)).timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Decode and validate a bearer token
pub fn decode_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::new(ErrorCode::TokenExpired),
        _ => AppError::new(ErrorCode::TokenInvalid),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-which-is-at-least-32-chars!";

    #[test]
    fn test_token_roundtrip() {
        let token = create_token(42, Role::Manager, Some(3), SECRET).unwrap();
        let claims = decode_token(&token, SECRET).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.role, Role::Manager);
        assert_eq!(claims.branch_id, Some(3));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = create_token(42, Role::Cashier, None, SECRET).unwrap();
        let err = decode_token(&token, "another-secret-that-is-32-chars-long!!").unwrap_err();
        assert_eq!(err.code, ErrorCode::TokenInvalid);
    }
}
