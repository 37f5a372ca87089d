//! Authenticated HTTP client for the Crust API

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use shared::headers;

use crate::{ClientError, ClientResult};

/// Error envelope returned by the server on failure
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}

/// Login response
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub actor: serde_json::Value,
}

/// HTTP client trait; the in-process mock in tests implements this too
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T>;
    async fn post<T: DeserializeOwned, B: serde::Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
        idempotency_key: Option<&str>,
    ) -> ClientResult<T>;
    async fn put<T: DeserializeOwned, B: serde::Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
        idempotency_key: Option<&str>,
    ) -> ClientResult<T>;
    async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        idempotency_key: Option<&str>,
    ) -> ClientResult<T>;
    async fn login(&mut self, username: &str, password: &str) -> ClientResult<LoginResponse>;
    fn token(&self) -> Option<&str>;
}

/// Network HTTP client
#[derive(Debug, Clone)]
pub struct NetworkHttpClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    /// Branch pinning for multi-branch actors (`X-Location-Id`)
    location_id: Option<i64>,
}

impl NetworkHttpClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            location_id: None,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
    }

    pub fn set_location(&mut self, branch_id: i64) {
        self.location_id = Some(branch_id);
    }

    fn apply_headers(
        &self,
        mut req: reqwest::RequestBuilder,
        idempotency_key: Option<&str>,
    ) -> reqwest::RequestBuilder {
        if let Some(token) = &self.token {
            req = req.header(reqwest::header::AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(location) = self.location_id {
            req = req.header(headers::LOCATION_ID, location.to_string());
        }
        if let Some(key) = idempotency_key {
            req = req.header(headers::IDEMPOTENCY_KEY, key);
        }
        req
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> ClientResult<T> {
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await?;
            if let Ok(api_err) = serde_json::from_str::<ApiErrorResponse>(&text) {
                return Err(ClientError::Api {
                    status: status.as_u16(),
                    code: api_err.code,
                    message: api_err.error,
                    details: api_err.details,
                });
            }
            return match status {
                reqwest::StatusCode::UNAUTHORIZED => Err(ClientError::Unauthorized),
                _ => Err(ClientError::InvalidResponse(text)),
            };
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl HttpClient for NetworkHttpClient {
    async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let req = self.apply_headers(self.client.get(&url), None);
        self.handle_response(req.send().await?).await
    }

    async fn post<T: DeserializeOwned, B: serde::Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
        idempotency_key: Option<&str>,
    ) -> ClientResult<T> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let req = self.apply_headers(self.client.post(&url).json(body), idempotency_key);
        self.handle_response(req.send().await?).await
    }

    async fn put<T: DeserializeOwned, B: serde::Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
        idempotency_key: Option<&str>,
    ) -> ClientResult<T> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let req = self.apply_headers(self.client.put(&url).json(body), idempotency_key);
        self.handle_response(req.send().await?).await
    }

    async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        idempotency_key: Option<&str>,
    ) -> ClientResult<T> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let req = self.apply_headers(self.client.delete(&url), idempotency_key);
        self.handle_response(req.send().await?).await
    }

    async fn login(&mut self, username: &str, password: &str) -> ClientResult<LoginResponse> {
        let url = format!("{}/auth/login", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await?;
        let login: LoginResponse = self.handle_response(response).await?;
        self.token = Some(login.token.clone());
        Ok(login)
    }

    fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}
