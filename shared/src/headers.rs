//! Wire-level header names shared by server and client
//!
//! Mutating endpoints accept an idempotency key and branch pinning; replayed
//! offline-queue requests carry attribution headers so audit surfaces can
//! show "synced via X on behalf of Y".

/// Client-generated idempotency key, required on every mutating request.
pub const IDEMPOTENCY_KEY: &str = "x-idempotency-key";

/// Branch context for actors with multi-branch access.
pub const LOCATION_ID: &str = "x-location-id";

/// Set to `true` when a request is replayed from the offline queue.
pub const QUEUED_REQUEST: &str = "x-queued-request";

/// Original creator of an offline-queued operation.
pub const OFFLINE_ACTOR_ID: &str = "x-offline-actor-id";

/// Original enqueue time (epoch millis) of an offline-queued operation.
pub const QUEUED_CREATED_AT: &str = "x-queued-created-at";

/// Request id echoed into the error envelope.
pub const REQUEST_ID: &str = "x-request-id";

/// Maximum accepted idempotency key length.
pub const IDEMPOTENCY_KEY_MAX_LEN: usize = 120;
