//! Offline operation queue
//!
//! - **types**: operation state, outcome classification, backoff and
//!   interval policy (pure, unit-tested)
//! - **storage**: redb-backed queue + outcome history (ring of ~200)
//! - **worker**: the single-flight sync pass and its scheduling loop
//!
//! Mutating requests enqueue here when the network fails; replay order is
//! FIFO per client, and every operation carries an idempotency key so the
//! server applies it at most once no matter how often it is resent.

pub mod storage;
pub mod types;
pub mod worker;

pub use storage::OfflineStore;
pub use types::{
    ConnectionQuality, HistoryEntry, OperationStatus, QueuedOperation, ReplayOutcome,
};
pub use worker::{ReplayTransport, SyncWorker};

use uuid::Uuid;

use crate::{ClientError, ClientResult};
use shared::util::now_millis;

/// A mutating request to queue for replay
#[derive(Debug, Clone)]
pub struct EnqueueRequest {
    pub url: String,
    pub method: String,
    pub data: serde_json::Value,
    /// Extra headers to replay verbatim (auth/branch context)
    pub headers: Vec<(String, String)>,
    /// Supplied by the caller, or generated here; every mutating enqueue
    /// carries one
    pub idempotency_key: Option<String>,
    /// The operation whose server-assigned id this one depends on; must
    /// already be synced
    pub depends_on: Option<Uuid>,
}

/// Handle over the persistent queue: enqueue plus the admin review actions.
#[derive(Clone)]
pub struct OfflineQueue {
    store: OfflineStore,
}

impl OfflineQueue {
    pub fn new(store: OfflineStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &OfflineStore {
        &self.store
    }

    /// Persist a mutating request for replay. Fails if the operation it
    /// depends on is still in the queue (server id not assigned yet).
    pub fn enqueue(&self, request: EnqueueRequest) -> ClientResult<QueuedOperation> {
        if let Some(parent) = request.depends_on
            && self.store.find_by_id(parent)?.is_some()
        {
            return Err(ClientError::DependencyPending(parent));
        }

        let op = QueuedOperation {
            id: Uuid::new_v4(),
            url: request.url,
            method: request.method,
            data: request.data,
            headers: request.headers,
            idempotency_key: request
                .idempotency_key
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            created_at: now_millis(),
            retries: 0,
            last_attempt_at: None,
            status: OperationStatus::Pending,
            last_error: None,
            admin_note: None,
        };
        self.store.enqueue(&op)?;
        tracing::debug!(op_id = %op.id, url = %op.url, "Operation queued");
        Ok(op)
    }

    /// Admin action: send a stuck operation back to the pending set.
    pub fn retry(&self, op_id: Uuid, note: Option<String>) -> ClientResult<()> {
        self.admin_transition(op_id, OperationStatus::Pending, "retry", note)
    }

    /// Admin action: mark an operation synced without re-sending it.
    pub fn resolve(&self, op_id: Uuid, note: Option<String>) -> ClientResult<()> {
        self.admin_transition(op_id, OperationStatus::Resolved, "resolve", note)
    }

    /// Admin action: drop an operation from replay for good.
    pub fn ignore(&self, op_id: Uuid, note: Option<String>) -> ClientResult<()> {
        self.admin_transition(op_id, OperationStatus::Ignored, "ignore", note)
    }

    fn admin_transition(
        &self,
        op_id: Uuid,
        status: OperationStatus,
        action: &str,
        note: Option<String>,
    ) -> ClientResult<()> {
        let Some((seq, mut op)) = self.store.find_by_id(op_id)? else {
            return Err(ClientError::Internal(format!("operation {op_id} not found")));
        };

        op.status = status;
        op.admin_note = note.clone();

        self.store.push_history(&HistoryEntry {
            op_id: op.id,
            url: op.url.clone(),
            method: op.method.clone(),
            status,
            error: op.last_error.clone(),
            note,
            at: now_millis(),
        })?;

        // Terminal admin outcomes leave the queue; retry stays in it
        if matches!(status, OperationStatus::Resolved | OperationStatus::Ignored) {
            self.store.remove(seq)?;
        } else {
            op.retries = 0;
            op.last_error = None;
            self.store.update(seq, &op)?;
        }

        tracing::info!(op_id = %op_id, action, "Admin queue action");
        Ok(())
    }

    /// Operations awaiting admin review (conflict / needs_review).
    pub fn review_set(&self) -> ClientResult<Vec<QueuedOperation>> {
        Ok(self
            .store
            .list()?
            .into_iter()
            .map(|(_, op)| op)
            .filter(|op| {
                matches!(
                    op.status,
                    OperationStatus::Conflict | OperationStatus::NeedsReview
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue() -> OfflineQueue {
        OfflineQueue::new(OfflineStore::open_in_memory().unwrap())
    }

    fn request(url: &str) -> EnqueueRequest {
        EnqueueRequest {
            url: url.into(),
            method: "POST".into(),
            data: serde_json::json!({"items": []}),
            headers: vec![],
            idempotency_key: None,
            depends_on: None,
        }
    }

    #[test]
    fn test_enqueue_generates_idempotency_key() {
        let q = queue();
        let op = q.enqueue(request("/sales")).unwrap();
        assert!(!op.idempotency_key.is_empty());
        assert_eq!(op.status, OperationStatus::Pending);
    }

    #[test]
    fn test_enqueue_preserves_caller_key() {
        let q = queue();
        let mut req = request("/sales");
        req.idempotency_key = Some("k7".into());
        let op = q.enqueue(req).unwrap();
        assert_eq!(op.idempotency_key, "k7");
    }

    #[test]
    fn test_dependent_op_blocked_until_parent_synced() {
        let q = queue();
        let parent = q.enqueue(request("/inventory/batches")).unwrap();

        let mut child = request("/inventory/batches/42");
        child.depends_on = Some(parent.id);
        let err = q.enqueue(child.clone()).unwrap_err();
        assert!(matches!(err, ClientError::DependencyPending(id) if id == parent.id));

        // Once the parent has left the queue the child may enter
        let (seq, _) = q.store.find_by_id(parent.id).unwrap().unwrap();
        q.store.remove(seq).unwrap();
        assert!(q.enqueue(child).is_ok());
    }

    #[test]
    fn test_resolve_removes_and_logs() {
        let q = queue();
        let op = q.enqueue(request("/sales")).unwrap();
        q.resolve(op.id, Some("applied by hand".into())).unwrap();

        assert!(q.store.find_by_id(op.id).unwrap().is_none());
        let history = q.store.history().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, OperationStatus::Resolved);
        assert_eq!(history[0].note.as_deref(), Some("applied by hand"));
    }

    #[test]
    fn test_retry_resets_and_keeps_in_queue() {
        let q = queue();
        let op = q.enqueue(request("/sales")).unwrap();

        let (seq, mut stored) = q.store.find_by_id(op.id).unwrap().unwrap();
        stored.status = OperationStatus::NeedsReview;
        stored.retries = 5;
        stored.last_error = Some("400".into());
        q.store.update(seq, &stored).unwrap();

        q.retry(op.id, None).unwrap();
        let (_, after) = q.store.find_by_id(op.id).unwrap().unwrap();
        assert_eq!(after.status, OperationStatus::Pending);
        assert_eq!(after.retries, 0);
        assert!(after.last_error.is_none());
    }

    #[test]
    fn test_review_set_filters_statuses() {
        let q = queue();
        let a = q.enqueue(request("/a")).unwrap();
        let b = q.enqueue(request("/b")).unwrap();
        let _c = q.enqueue(request("/c")).unwrap();

        let (seq_a, mut op_a) = q.store.find_by_id(a.id).unwrap().unwrap();
        op_a.status = OperationStatus::Conflict;
        q.store.update(seq_a, &op_a).unwrap();

        let (seq_b, mut op_b) = q.store.find_by_id(b.id).unwrap().unwrap();
        op_b.status = OperationStatus::NeedsReview;
        q.store.update(seq_b, &op_b).unwrap();

        let review = q.review_set().unwrap();
        assert_eq!(review.len(), 2);
    }
}
