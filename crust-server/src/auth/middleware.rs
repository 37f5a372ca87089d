//! Bearer-token middleware

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use shared::error::AppError;

use super::extractor::AuthActor;
use super::jwt;
use crate::state::AppState;

/// Verify the `Authorization: Bearer` token and stash the resolved
/// [`AuthActor`] in request extensions for handlers and extractors.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, Response> {
    let auth_header = request
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::unauthorized().into_response())?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::unauthorized().into_response())?;

    let claims = jwt::decode_token(token, &state.jwt_secret).map_err(|e| {
        tracing::debug!("JWT validation failed: {e}");
        e.into_response()
    })?;

    request.extensions_mut().insert(AuthActor {
        actor_id: claims.sub,
        role: claims.role,
        home_branch_id: claims.branch_id,
    });

    Ok(next.run(request).await)
}
