//! Authentication and authorization
//!
//! JWT bearer auth resolving `{actor_id, role, branch_id}`, branch pinning
//! via `X-Location-Id`, argon2 password hashing, a single role/action
//! capability matrix, and per-IP rate limiting on the auth routes.

pub mod extractor;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod permissions;
pub mod rate_limit;

pub use extractor::{AuthActor, BranchContext, IdemKey, QueuedMeta};
pub use permissions::Action;
