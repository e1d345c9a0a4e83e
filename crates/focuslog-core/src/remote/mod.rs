//! Remote service access: wire types, error taxonomy, and the HTTP client.

mod client;
pub mod types;

pub use client::ApiClient;

use thiserror::Error;
use uuid::Uuid;

use types::{
    ProjectCreate, RemoteProject, RemoteSession, RemoteSessionEvent, RemoteTask, SessionCreate,
    SessionEventBatch, SessionUpdate, TaskCreate, TaskUpdate,
};

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid API configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Unauthorized after token refresh")]
    Unauthorized,

    #[error("Rate limited by remote service")]
    RateLimited,

    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// Whether a later retry could plausibly succeed without user action.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::Http(_) | Self::Server { .. } | Self::Unauthorized
        )
    }
}

/// Everything the sync engine needs from the remote service.
///
/// `ApiClient` is the production implementation; tests substitute fakes.
#[async_trait::async_trait]
pub trait RemoteApi: Send + Sync {
    async fn create_project(&self, body: &ProjectCreate) -> ApiResult<RemoteProject>;

    async fn list_projects(&self) -> ApiResult<Vec<RemoteProject>>;

    async fn create_task(&self, body: &TaskCreate) -> ApiResult<RemoteTask>;

    async fn update_task(&self, id: Uuid, body: &TaskUpdate) -> ApiResult<RemoteTask>;

    async fn list_tasks(&self) -> ApiResult<Vec<RemoteTask>>;

    async fn create_session(&self, body: &SessionCreate) -> ApiResult<RemoteSession>;

    async fn update_session(&self, id: Uuid, body: &SessionUpdate) -> ApiResult<RemoteSession>;

    async fn create_session_events(
        &self,
        session_id: Uuid,
        body: &SessionEventBatch,
    ) -> ApiResult<Vec<RemoteSessionEvent>>;
}
