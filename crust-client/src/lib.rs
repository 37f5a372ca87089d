//! crust-client — terminal-side client for the Crust bakery backend
//!
//! A thin authenticated HTTP client plus the offline operation queue:
//! mutating requests issued while the server is unreachable are persisted
//! locally (redb), replayed in FIFO order with backoff once connectivity
//! returns, and classified for admin review when they cannot converge on
//! their own. Exactly-once semantics come from the server's idempotency
//! gate; every enqueued operation carries a key.

pub mod api;
pub mod error;
pub mod http;
pub mod queue;

pub use api::{SubmitResult, TerminalClient};
pub use error::{ClientError, ClientResult};
pub use http::{HttpClient, NetworkHttpClient};
pub use queue::{
    ConnectionQuality, EnqueueRequest, OfflineQueue, OperationStatus, QueuedOperation,
    SyncWorker,
};
