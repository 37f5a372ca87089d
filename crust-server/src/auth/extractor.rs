//! Request extractors: authenticated actor, pinned branch, idempotency key,
//! offline-replay attribution

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use shared::error::AppError;
use shared::headers;
use shared::models::Role;

use crate::state::AppState;

/// The authenticated principal, resolved by the auth middleware
#[derive(Debug, Clone, Copy)]
pub struct AuthActor {
    pub actor_id: i64,
    pub role: Role,
    pub home_branch_id: Option<i64>,
}

impl<S> FromRequestParts<S> for AuthActor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthActor>()
            .copied()
            .ok_or_else(AppError::unauthorized)
    }
}

/// The branch a branch-scoped operation runs against.
///
/// `X-Location-Id` pins the branch for multi-branch actors; it must name a
/// branch the actor has access to (admins may pin any branch). Without the
/// header the actor's home branch applies.
#[derive(Debug, Clone, Copy)]
pub struct BranchContext {
    pub branch_id: i64,
}

impl FromRequestParts<AppState> for BranchContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let actor = AuthActor::from_request_parts(parts, state).await?;

        let pinned: Option<i64> = parts
            .headers
            .get(headers::LOCATION_ID)
            .and_then(|v| v.to_str().ok())
            .map(|v| {
                v.parse().map_err(|_| {
                    AppError::validation("X-Location-Id must be a branch id")
                })
            })
            .transpose()?;

        match pinned {
            Some(branch_id) => {
                if actor.role != Role::Admin
                    && actor.home_branch_id != Some(branch_id)
                    && !crate::db::branches::actor_has_access(
                        &state.pool,
                        actor.actor_id,
                        branch_id,
                    )
                    .await
                    .map_err(AppError::from)?
                {
                    return Err(AppError::forbidden("No access to this branch"));
                }
                Ok(Self { branch_id })
            }
            None => actor
                .home_branch_id
                .map(|branch_id| Self { branch_id })
                .ok_or_else(|| {
                    AppError::validation("X-Location-Id required for multi-branch actors")
                }),
        }
    }
}

/// Optional idempotency key from `X-Idempotency-Key`
#[derive(Debug, Clone)]
pub struct IdemKey(pub Option<String>);

impl<S> FromRequestParts<S> for IdemKey
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let key = parts
            .headers
            .get(headers::IDEMPOTENCY_KEY)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        Ok(Self(key))
    }
}

/// Offline-queue replay attribution headers
#[derive(Debug, Clone, Copy, Default)]
pub struct QueuedMeta {
    /// `X-Queued-Request: true`
    pub is_queued: bool,
    /// Original creator (`X-Offline-Actor-Id`)
    pub offline_actor_id: Option<i64>,
    /// Original enqueue time, epoch millis (`X-Queued-Created-At`)
    pub queued_created_at: Option<i64>,
}

impl<S> FromRequestParts<S> for QueuedMeta
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned)
        };

        Ok(Self {
            is_queued: header(headers::QUEUED_REQUEST)
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            offline_actor_id: header(headers::OFFLINE_ACTOR_ID).and_then(|v| v.parse().ok()),
            queued_created_at: header(headers::QUEUED_CREATED_AT).and_then(|v| v.parse().ok()),
        })
    }
}
