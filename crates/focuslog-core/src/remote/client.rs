//! HTTP client for the remote service.

use std::sync::Arc;

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::types::{
    ProjectCreate, RemoteProject, RemoteSession, RemoteSessionEvent, RemoteTask, SessionCreate,
    SessionEventBatch, SessionUpdate, TaskCreate, TaskUpdate,
};
use super::{ApiError, ApiResult, RemoteApi};
use crate::auth::TokenProvider;

/// Typed request/response wrapper over the remote HTTP API.
///
/// Injects a bearer token on every call and performs exactly one
/// refresh-and-retry when the service answers 401.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    auth: Arc<dyn TokenProvider>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, auth: Arc<dyn TokenProvider>) -> ApiResult<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        Ok(Self {
            base_url,
            http: reqwest::Client::builder().build()?,
            auth,
        })
    }

    /// Issue a request and decode the JSON response into `T`.
    pub async fn request<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized + Sync,
    {
        let response = self.execute(method, path, body).await?;
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Issue a request and discard the response body (fire-and-forget).
    pub async fn request_void<B>(&self, method: Method, path: &str, body: Option<&B>) -> ApiResult<()>
    where
        B: Serialize + ?Sized + Sync,
    {
        self.execute(method, path, body).await?;
        Ok(())
    }

    /// Issue a request and return the raw response bytes, for binary and
    /// export endpoints.
    pub async fn request_raw(&self, method: Method, path: &str) -> ApiResult<Vec<u8>> {
        let response = self.execute(method, path, None::<&()>).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn execute<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> ApiResult<reqwest::Response>
    where
        B: Serialize + ?Sized + Sync,
    {
        let token = self
            .auth
            .access_token()
            .await
            .ok_or(ApiError::NotAuthenticated)?;

        let mut response = self.send_once(method.clone(), path, &token, body).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            if !self.auth.refresh().await {
                return Err(ApiError::Unauthorized);
            }
            let token = self
                .auth
                .access_token()
                .await
                .ok_or(ApiError::Unauthorized)?;

            tracing::debug!(path, "retrying request with refreshed token");
            response = self.send_once(method, path, &token, body).await?;
            if response.status() == StatusCode::UNAUTHORIZED {
                return Err(ApiError::Unauthorized);
            }
        }

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ApiError::RateLimited);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Server {
            status: status.as_u16(),
            message: parse_api_error(&body),
        })
    }

    async fn send_once<B>(
        &self,
        method: Method,
        path: &str,
        token: &str,
        body: Option<&B>,
    ) -> ApiResult<reqwest::Response>
    where
        B: Serialize + ?Sized + Sync,
    {
        let url = format!("{}{path}", self.base_url);
        let mut request = self
            .http
            .request(method, url)
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }
}

#[async_trait::async_trait]
impl RemoteApi for ApiClient {
    async fn create_project(&self, body: &ProjectCreate) -> ApiResult<RemoteProject> {
        self.request(Method::POST, "/projects", Some(body)).await
    }

    async fn list_projects(&self) -> ApiResult<Vec<RemoteProject>> {
        self.request(Method::GET, "/projects", None::<&()>).await
    }

    async fn create_task(&self, body: &TaskCreate) -> ApiResult<RemoteTask> {
        self.request(Method::POST, "/tasks", Some(body)).await
    }

    async fn update_task(&self, id: Uuid, body: &TaskUpdate) -> ApiResult<RemoteTask> {
        self.request(Method::PATCH, &format!("/tasks/{id}"), Some(body))
            .await
    }

    async fn list_tasks(&self) -> ApiResult<Vec<RemoteTask>> {
        self.request(Method::GET, "/tasks", None::<&()>).await
    }

    async fn create_session(&self, body: &SessionCreate) -> ApiResult<RemoteSession> {
        self.request(Method::POST, "/sessions", Some(body)).await
    }

    async fn update_session(&self, id: Uuid, body: &SessionUpdate) -> ApiResult<RemoteSession> {
        self.request(Method::PATCH, &format!("/sessions/{id}"), Some(body))
            .await
    }

    async fn create_session_events(
        &self,
        session_id: Uuid,
        body: &SessionEventBatch,
    ) -> ApiResult<Vec<RemoteSessionEvent>> {
        self.request(
            Method::POST,
            &format!("/sessions/{session_id}/events"),
            Some(body),
        )
        .await
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    detail: Option<serde_json::Value>,
    message: Option<String>,
    error: Option<String>,
}

/// Pull a human-readable message out of a JSON error body, falling back to
/// the raw text.
fn parse_api_error(body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(detail) = payload.detail {
            if let Some(text) = detail.as_str() {
                return text.trim().to_string();
            }
            return detail.to_string();
        }
        if let Some(message) = payload.message.or(payload.error) {
            return message.trim().to_string();
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        "no error body".to_string()
    } else {
        trimmed.to_string()
    }
}

fn normalize_base_url(raw: String) -> ApiResult<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ApiError::InvalidConfiguration(
            "base URL must not be empty".to_string(),
        ));
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(trimmed.to_string())
    } else {
        Err(ApiError::InvalidConfiguration(
            "base URL must include http:// or https://".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use pretty_assertions::assert_eq;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::auth::StaticTokens;

    /// Token provider whose refresh swaps in a second token.
    struct RotatingTokens {
        current: Mutex<String>,
        next: Mutex<Option<String>>,
        refreshes: AtomicUsize,
    }

    impl RotatingTokens {
        fn new(current: &str, next: Option<&str>) -> Self {
            Self {
                current: Mutex::new(current.to_string()),
                next: Mutex::new(next.map(ToString::to_string)),
                refreshes: AtomicUsize::new(0),
            }
        }

        fn refresh_count(&self) -> usize {
            self.refreshes.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl TokenProvider for RotatingTokens {
        async fn access_token(&self) -> Option<String> {
            Some(self.current.lock().unwrap().clone())
        }

        async fn refresh(&self) -> bool {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            match self.next.lock().unwrap().take() {
                Some(token) => {
                    *self.current.lock().unwrap() = token;
                    true
                }
                None => false,
            }
        }
    }

    #[derive(Debug, serde::Deserialize, PartialEq)]
    struct Pong {
        pong: bool,
    }

    #[tokio::test]
    async fn rejects_base_url_without_scheme() {
        let auth = Arc::new(StaticTokens::new("t"));
        assert!(ApiClient::new("api.example.com", auth.clone()).is_err());
        assert!(ApiClient::new("", auth).is_err());
    }

    #[tokio::test]
    async fn decodes_successful_response_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .and(header("authorization", "Bearer token-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "pong": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client =
            ApiClient::new(server.uri(), Arc::new(StaticTokens::new("token-1"))).unwrap();
        let pong: Pong = client
            .request(Method::GET, "/ping", None::<&()>)
            .await
            .unwrap();
        assert_eq!(pong, Pong { pong: true });
    }

    #[tokio::test]
    async fn refreshes_once_on_401_and_returns_body_transparently() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .and(header("authorization", "Bearer stale"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .and(header("authorization", "Bearer fresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "pong": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let auth = Arc::new(RotatingTokens::new("stale", Some("fresh")));
        let client = ApiClient::new(server.uri(), auth.clone()).unwrap();

        let pong: Pong = client
            .request(Method::GET, "/ping", None::<&()>)
            .await
            .unwrap();
        assert_eq!(pong, Pong { pong: true });
        assert_eq!(auth.refresh_count(), 1);
    }

    #[tokio::test]
    async fn second_401_after_refresh_is_a_hard_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .respond_with(ResponseTemplate::new(401))
            .expect(2)
            .mount(&server)
            .await;

        let auth = Arc::new(RotatingTokens::new("stale", Some("still-bad")));
        let client = ApiClient::new(server.uri(), auth.clone()).unwrap();

        let result: ApiResult<Pong> = client.request(Method::GET, "/ping", None::<&()>).await;
        assert!(matches!(result, Err(ApiError::Unauthorized)));
        assert_eq!(auth.refresh_count(), 1);
    }

    #[tokio::test]
    async fn failed_refresh_skips_the_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let auth = Arc::new(RotatingTokens::new("stale", None));
        let client = ApiClient::new(server.uri(), auth).unwrap();

        let result: ApiResult<Pong> = client.request(Method::GET, "/ping", None::<&()>).await;
        assert!(matches!(result, Err(ApiError::Unauthorized)));
    }

    #[tokio::test]
    async fn classifies_429_as_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tasks"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri(), Arc::new(StaticTokens::new("t"))).unwrap();
        let result = client.list_tasks().await;
        assert!(matches!(result, Err(ApiError::RateLimited)));
    }

    #[tokio::test]
    async fn surfaces_server_errors_with_parsed_detail() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tasks"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "detail": "database unavailable"
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri(), Arc::new(StaticTokens::new("t"))).unwrap();
        match client.list_tasks().await {
            Err(ApiError::Server { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "database unavailable");
            }
            other => panic!("expected server error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_token_fails_before_any_network_call() {
        let server = MockServer::start().await;
        // No mocks mounted: any request would 404 and fail differently.

        let client = ApiClient::new(server.uri(), Arc::new(StaticTokens::signed_out())).unwrap();
        let result: ApiResult<Pong> = client.request(Method::GET, "/ping", None::<&()>).await;
        assert!(matches!(result, Err(ApiError::NotAuthenticated)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn void_variant_discards_the_body() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/cache"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri(), Arc::new(StaticTokens::new("t"))).unwrap();
        client
            .request_void(Method::DELETE, "/cache", None::<&()>)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn raw_variant_returns_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/export"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"csv,data".to_vec()))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri(), Arc::new(StaticTokens::new("t"))).unwrap();
        let bytes = client.request_raw(Method::GET, "/export").await.unwrap();
        assert_eq!(bytes, b"csv,data".to_vec());
    }

    #[test]
    fn parse_api_error_prefers_detail_then_message() {
        assert_eq!(parse_api_error(r#"{"detail": "nope"}"#), "nope");
        assert_eq!(parse_api_error(r#"{"message": "bad"}"#), "bad");
        assert_eq!(parse_api_error("plain text"), "plain text");
        assert_eq!(parse_api_error(""), "no error body");
    }
}
