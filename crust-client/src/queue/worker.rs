//! Sync worker — replays the offline queue
//!
//! Single-flight: one sync pass at a time, guarded by a boolean latch;
//! timers and reconnect kicks that fire mid-pass observe the latch and
//! no-op. Operations replay in FIFO order with their stored idempotency
//! key and `X-Queued-Request: true`, so the server deduplicates however
//! often a flaky network makes us resend.

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use shared::headers;
use shared::util::now_millis;

use super::storage::OfflineStore;
use super::types::{
    ConnectionQuality, HistoryEntry, MAX_RETRIES, OperationStatus, QueuedOperation,
    ReplayOutcome, backoff_delay_ms, classify_status, next_status, sync_interval,
};

/// Transport used to resend one queued operation.
///
/// `Ok(status)` for any HTTP response the server produced; `Err` only for
/// transport-level failures (refused, reset, timeout).
#[async_trait]
pub trait ReplayTransport: Send + Sync {
    async fn send(&self, op: &QueuedOperation) -> Result<u16, String>;
}

/// reqwest-backed transport; replays the stored request with its queue
/// attribution headers.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpTransport {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }
}

#[async_trait]
impl ReplayTransport for HttpTransport {
    async fn send(&self, op: &QueuedOperation) -> Result<u16, String> {
        let method: reqwest::Method = op
            .method
            .parse()
            .map_err(|_| format!("invalid method {}", op.method))?;
        let url = format!("{}/{}", self.base_url, op.url.trim_start_matches('/'));

        let mut req = self
            .client
            .request(method, &url)
            .header(headers::IDEMPOTENCY_KEY, &op.idempotency_key)
            .header(headers::QUEUED_REQUEST, "true")
            .header(headers::QUEUED_CREATED_AT, op.created_at.to_string());
        if let Some(token) = &self.token {
            req = req.header(reqwest::header::AUTHORIZATION, format!("Bearer {token}"));
        }
        for (name, value) in &op.headers {
            req = req.header(name.as_str(), value.as_str());
        }
        if !op.data.is_null() {
            req = req.json(&op.data);
        }

        match req.send().await {
            Ok(response) => Ok(response.status().as_u16()),
            Err(e) => Err(e.to_string()),
        }
    }
}

/// The queue's scheduling loop plus the single-flight sync pass.
pub struct SyncWorker<T: ReplayTransport> {
    store: OfflineStore,
    transport: T,
    latch: Arc<AtomicBool>,
    quality: Arc<std::sync::Mutex<ConnectionQuality>>,
    kick: Arc<Notify>,
    shutdown: CancellationToken,
    max_retries: u32,
}

impl<T: ReplayTransport> SyncWorker<T> {
    pub fn new(store: OfflineStore, transport: T, shutdown: CancellationToken) -> Self {
        Self {
            store,
            transport,
            latch: Arc::new(AtomicBool::new(false)),
            quality: Arc::new(std::sync::Mutex::new(ConnectionQuality::Regular)),
            kick: Arc::new(Notify::new()),
            shutdown,
            max_retries: MAX_RETRIES,
        }
    }

    /// Report a connectivity measurement; drives the timer interval.
    pub fn set_quality(&self, quality: ConnectionQuality) {
        *self.quality.lock().unwrap() = quality;
    }

    /// Handle used to request an immediate pass (reconnect, visibility
    /// regain).
    pub fn kick_handle(&self) -> Arc<Notify> {
        self.kick.clone()
    }

    /// Run until shutdown: a pass on startup (page load), then on every
    /// kick or timer tick.
    pub async fn run(self) {
        tracing::info!("Sync worker started");
        self.sync_pass().await;

        loop {
            let interval = {
                let quality = *self.quality.lock().unwrap();
                let (pending, failed) = self.store.replay_counts().unwrap_or((0, 0));
                sync_interval(quality, pending, failed)
            };

            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Sync worker shutting down");
                    break;
                }
                _ = self.kick.notified() => self.sync_pass().await,
                _ = tokio::time::sleep(interval) => self.sync_pass().await,
            }
        }
    }

    /// One pass over the queue in FIFO order. Re-entrant calls no-op on
    /// the latch.
    pub async fn sync_pass(&self) {
        if self.latch.swap(true, Ordering::AcqRel) {
            tracing::debug!("Sync already in flight, skipping pass");
            return;
        }

        if let Err(e) = self.drain_queue().await {
            tracing::error!(error = %e, "Sync pass aborted");
        }

        self.latch.store(false, Ordering::Release);
    }

    async fn drain_queue(&self) -> Result<(), crate::ClientError> {
        let now = now_millis();
        for (seq, op) in self.store.list()? {
            if !op.status.is_replayable() || !is_due(&op, now) {
                continue;
            }
            let outcome = self.attempt(seq, op).await?;
            // The link is down; later operations would only pile up errors
            if outcome == ReplayOutcome::NetworkError {
                break;
            }
        }
        Ok(())
    }

    /// Send one operation and fold the outcome into its stored state.
    async fn attempt(
        &self,
        seq: u64,
        mut op: QueuedOperation,
    ) -> Result<ReplayOutcome, crate::ClientError> {
        let result = self.transport.send(&op).await;
        let outcome = match &result {
            Ok(status) => classify_status(*status),
            Err(_) => ReplayOutcome::NetworkError,
        };

        if !matches!(outcome, ReplayOutcome::Synced | ReplayOutcome::Conflict) {
            op.retries += 1;
        }
        let previous = op.status;
        op.status = next_status(outcome, op.retries, self.max_retries);
        op.last_attempt_at = Some(now_millis());
        op.last_error = match result {
            Ok(status) if outcome != ReplayOutcome::Synced => Some(format!("HTTP {status}")),
            Ok(_) => None,
            Err(e) => Some(e),
        };

        tracing::debug!(
            op_id = %op.id,
            url = %op.url,
            retries = op.retries,
            status = ?op.status,
            "Replay attempt"
        );

        if op.status != previous || op.status == OperationStatus::Synced {
            self.store.push_history(&HistoryEntry {
                op_id: op.id,
                url: op.url.clone(),
                method: op.method.clone(),
                status: op.status,
                error: op.last_error.clone(),
                note: None,
                at: now_millis(),
            })?;
        }

        if op.status == OperationStatus::Synced {
            self.store.remove(seq)?;
        } else {
            self.store.update(seq, &op)?;
        }
        Ok(outcome)
    }
}

/// Whether an operation's backoff window has elapsed.
fn is_due(op: &QueuedOperation, now: i64) -> bool {
    let Some(last) = op.last_attempt_at else {
        return true;
    };
    let jitter = {
        use rand::Rng;
        rand::thread_rng().gen_range(-0.25..=0.25)
    };
    // Backoff keys off the retry count that produced the last failure
    let delay = backoff_delay_ms(op.retries.saturating_sub(1), jitter);
    now >= last + delay as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{EnqueueRequest, OfflineQueue};
    use std::collections::VecDeque;
    use tokio::sync::Mutex;

    /// Scripted transport: pops one canned response per send.
    struct Scripted {
        responses: Mutex<VecDeque<Result<u16, String>>>,
        sent: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(responses: Vec<Result<u16, String>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ReplayTransport for Scripted {
        async fn send(&self, op: &QueuedOperation) -> Result<u16, String> {
            self.sent.lock().await.push(op.url.clone());
            self.responses
                .lock()
                .await
                .pop_front()
                .unwrap_or(Ok(200))
        }
    }

    fn setup(responses: Vec<Result<u16, String>>) -> (OfflineQueue, SyncWorker<Scripted>) {
        let store = OfflineStore::open_in_memory().unwrap();
        let queue = OfflineQueue::new(store.clone());
        let worker = SyncWorker::new(store, Scripted::new(responses), CancellationToken::new());
        (queue, worker)
    }

    fn request(url: &str) -> EnqueueRequest {
        EnqueueRequest {
            url: url.into(),
            method: "POST".into(),
            data: serde_json::json!({"qty": 1}),
            headers: vec![],
            idempotency_key: None,
            depends_on: None,
        }
    }

    /// Rewind the backoff clock so the next pass sees the op as due.
    fn make_due(queue: &OfflineQueue, id: uuid::Uuid) {
        let (seq, mut op) = queue.store().find_by_id(id).unwrap().unwrap();
        op.last_attempt_at = Some(now_millis() - 120_000);
        queue.store().update(seq, &op).unwrap();
    }

    #[tokio::test]
    async fn test_success_removes_from_queue() {
        let (queue, worker) = setup(vec![Ok(200)]);
        queue.enqueue(request("/sales")).unwrap();

        worker.sync_pass().await;

        assert!(queue.store().list().unwrap().is_empty());
        let history = queue.store().history().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, OperationStatus::Synced);
    }

    #[tokio::test]
    async fn test_server_error_then_success() {
        // 5xx once, 200 on the second try: one sale, queue empty, history synced
        let (queue, worker) = setup(vec![Ok(503), Ok(200)]);
        let op = queue.enqueue(request("/sales")).unwrap();

        worker.sync_pass().await;
        let (_, stored) = queue.store().find_by_id(op.id).unwrap().unwrap();
        assert_eq!(stored.status, OperationStatus::Retrying);
        assert_eq!(stored.retries, 1);
        assert_eq!(stored.last_error.as_deref(), Some("HTTP 503"));

        make_due(&queue, op.id);
        worker.sync_pass().await;
        assert!(queue.store().list().unwrap().is_empty());
        let history = queue.store().history().unwrap();
        assert_eq!(history.last().unwrap().status, OperationStatus::Synced);
    }

    #[tokio::test]
    async fn test_conflict_parks_for_admin() {
        let (queue, worker) = setup(vec![Ok(409)]);
        let op = queue.enqueue(request("/sales")).unwrap();

        worker.sync_pass().await;

        let (_, stored) = queue.store().find_by_id(op.id).unwrap().unwrap();
        assert_eq!(stored.status, OperationStatus::Conflict);
        assert_eq!(stored.retries, 0);
        assert_eq!(queue.review_set().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_client_error_escalates_to_review() {
        let responses: Vec<_> = std::iter::repeat_with(|| Ok(400)).take(5).collect();
        let (queue, worker) = setup(responses);
        let op = queue.enqueue(request("/sales")).unwrap();

        for _ in 0..4 {
            worker.sync_pass().await;
            let (_, stored) = queue.store().find_by_id(op.id).unwrap().unwrap();
            assert_eq!(stored.status, OperationStatus::Failed);
            make_due(&queue, op.id);
        }
        worker.sync_pass().await;

        let (_, stored) = queue.store().find_by_id(op.id).unwrap().unwrap();
        assert_eq!(stored.status, OperationStatus::NeedsReview);
        assert_eq!(stored.retries, 5);
    }

    #[tokio::test]
    async fn test_network_error_stops_the_pass() {
        let (queue, worker) = setup(vec![Err("connection refused".into())]);
        let first = queue.enqueue(request("/first")).unwrap();
        let second = queue.enqueue(request("/second")).unwrap();

        worker.sync_pass().await;

        let (_, a) = queue.store().find_by_id(first.id).unwrap().unwrap();
        assert_eq!(a.status, OperationStatus::Retrying);
        // The second op was never attempted
        let (_, b) = queue.store().find_by_id(second.id).unwrap().unwrap();
        assert_eq!(b.status, OperationStatus::Pending);
        assert!(b.last_attempt_at.is_none());
    }

    #[tokio::test]
    async fn test_fifo_replay_order() {
        let (queue, worker) = setup(vec![Ok(200), Ok(200), Ok(200)]);
        queue.enqueue(request("/a")).unwrap();
        queue.enqueue(request("/b")).unwrap();
        queue.enqueue(request("/c")).unwrap();

        worker.sync_pass().await;

        let sent = worker.transport.sent.lock().await.clone();
        assert_eq!(sent, vec!["/a", "/b", "/c"]);
    }

    #[tokio::test]
    async fn test_latch_is_single_flight() {
        let (queue, worker) = setup(vec![Ok(200)]);
        queue.enqueue(request("/sales")).unwrap();

        // Pre-claim the latch: the pass must no-op
        worker.latch.store(true, Ordering::Release);
        worker.sync_pass().await;
        assert_eq!(queue.store().list().unwrap().len(), 1);

        worker.latch.store(false, Ordering::Release);
        worker.sync_pass().await;
        assert!(queue.store().list().unwrap().is_empty());
    }
}
