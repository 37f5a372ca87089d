//! Offline-first submission facade
//!
//! Terminals call [`TerminalClient`] instead of the raw HTTP client: a
//! mutation is tried against the network first, and when the server is
//! unreachable (or answers 5xx) the request lands in the offline queue with
//! its idempotency key, to be replayed by the sync worker. The same key is
//! used for both the direct attempt and the replay, so a request that
//! actually reached the server before the connection dropped is never
//! applied twice.

use serde::de::DeserializeOwned;
use uuid::Uuid;

use shared::models::batch::BatchCreate;
use shared::models::sale::{SaleCreate, SaleReceipt};

use crate::http::HttpClient;
use crate::queue::{EnqueueRequest, OfflineQueue};
use crate::{ClientError, ClientResult};

/// What happened to a submitted mutation
#[derive(Debug, Clone)]
pub enum SubmitResult<T> {
    /// The server committed it; here is its response
    Committed(T),
    /// The server was unreachable; the operation is queued for replay
    Queued(Uuid),
}

/// Offline-first client: direct submission with queue fallback.
pub struct TerminalClient<C: HttpClient> {
    http: C,
    queue: OfflineQueue,
}

impl<C: HttpClient> TerminalClient<C> {
    pub fn new(http: C, queue: OfflineQueue) -> Self {
        Self { http, queue }
    }

    pub fn queue(&self) -> &OfflineQueue {
        &self.queue
    }

    pub fn http(&self) -> &C {
        &self.http
    }

    /// Submit a sale; enqueue it if the server cannot be reached.
    pub async fn submit_sale(&self, sale: &SaleCreate) -> ClientResult<SubmitResult<SaleReceipt>> {
        self.submit_post("/sales", sale).await
    }

    /// Submit a production batch; enqueue it if the server cannot be
    /// reached.
    pub async fn submit_batch(
        &self,
        batch: &BatchCreate,
    ) -> ClientResult<SubmitResult<serde_json::Value>> {
        self.submit_post("/inventory/batches", batch).await
    }

    async fn submit_post<T, B>(&self, path: &str, body: &B) -> ClientResult<SubmitResult<T>>
    where
        T: DeserializeOwned,
        B: serde::Serialize + Sync,
    {
        let idempotency_key = Uuid::new_v4().to_string();

        match self.http.post::<T, B>(path, body, Some(&idempotency_key)).await {
            Ok(response) => Ok(SubmitResult::Committed(response)),
            Err(e) if should_queue(&e) => {
                let op = self.queue.enqueue(EnqueueRequest {
                    url: path.to_string(),
                    method: "POST".to_string(),
                    data: serde_json::to_value(body)?,
                    headers: Vec::new(),
                    idempotency_key: Some(idempotency_key),
                    depends_on: None,
                })?;
                tracing::info!(op_id = %op.id, path, "Server unreachable, operation queued");
                Ok(SubmitResult::Queued(op.id))
            }
            Err(e) => Err(e),
        }
    }
}

/// Network failures and 5xx responses are queue material; 4xx responses are
/// the caller's problem right now.
fn should_queue(err: &ClientError) -> bool {
    match err {
        ClientError::Network(_) => true,
        ClientError::Api { status, .. } => *status >= 500,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::LoginResponse;
    use crate::queue::OfflineStore;
    use async_trait::async_trait;
    use shared::models::PaymentMethod;

    /// HTTP client that always fails the same way.
    struct DownServer(fn() -> ClientError);

    #[async_trait]
    impl HttpClient for DownServer {
        async fn get<T: DeserializeOwned>(&self, _path: &str) -> ClientResult<T> {
            Err((self.0)())
        }
        async fn post<T: DeserializeOwned, B: serde::Serialize + Sync>(
            &self,
            _path: &str,
            _body: &B,
            _idempotency_key: Option<&str>,
        ) -> ClientResult<T> {
            Err((self.0)())
        }
        async fn put<T: DeserializeOwned, B: serde::Serialize + Sync>(
            &self,
            _path: &str,
            _body: &B,
            _idempotency_key: Option<&str>,
        ) -> ClientResult<T> {
            Err((self.0)())
        }
        async fn delete<T: DeserializeOwned>(
            &self,
            _path: &str,
            _idempotency_key: Option<&str>,
        ) -> ClientResult<T> {
            Err((self.0)())
        }
        async fn login(&mut self, _u: &str, _p: &str) -> ClientResult<LoginResponse> {
            Err((self.0)())
        }
        fn token(&self) -> Option<&str> {
            None
        }
    }

    fn sale() -> SaleCreate {
        SaleCreate {
            items: vec![],
            payment_method: PaymentMethod::Cash,
            cashier_timing_ms: None,
        }
    }

    fn client(err: fn() -> ClientError) -> TerminalClient<DownServer> {
        TerminalClient::new(
            DownServer(err),
            OfflineQueue::new(OfflineStore::open_in_memory().unwrap()),
        )
    }

    #[tokio::test]
    async fn test_network_failure_queues_with_key() {
        let client = client(|| ClientError::Network("connection refused".into()));

        let result = client.submit_sale(&sale()).await.unwrap();
        let SubmitResult::Queued(op_id) = result else {
            panic!("expected queued submission");
        };

        let (_, op) = client.queue().store().find_by_id(op_id).unwrap().unwrap();
        assert_eq!(op.url, "/sales");
        assert!(!op.idempotency_key.is_empty());
    }

    #[tokio::test]
    async fn test_server_5xx_queues() {
        let client = client(|| ClientError::Api {
            status: 503,
            code: "DB_TRANSIENT".into(),
            message: "retry later".into(),
            details: None,
        });

        let result = client.submit_sale(&sale()).await.unwrap();
        assert!(matches!(result, SubmitResult::Queued(_)));
    }

    #[tokio::test]
    async fn test_client_error_is_not_queued() {
        let client = client(|| ClientError::Api {
            status: 409,
            code: "INSUFFICIENT_STOCK".into(),
            message: "insufficient stock".into(),
            details: None,
        });

        let err = client.submit_sale(&sale()).await.unwrap_err();
        assert!(matches!(err, ClientError::Api { status: 409, .. }));
        assert!(client.queue().store().list().unwrap().is_empty());
    }
}
