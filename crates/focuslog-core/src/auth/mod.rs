//! Auth collaborator seam.
//!
//! Token acquisition and storage live outside this crate; the sync engine
//! only needs a bearer token and a refresh operation.

use std::fmt;

use async_trait::async_trait;

/// Capability the remote client calls for bearer tokens.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// The current access token, if signed in.
    async fn access_token(&self) -> Option<String>;

    /// Attempt to refresh the access token. Returns whether a new token is
    /// available.
    async fn refresh(&self) -> bool;
}

/// A fixed token with no refresh capability. Used by the CLI (token from
/// the environment) and as a test double.
#[derive(Clone)]
pub struct StaticTokens {
    token: Option<String>,
}

impl StaticTokens {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    /// A provider with no token at all (signed-out state).
    #[must_use]
    pub const fn signed_out() -> Self {
        Self { token: None }
    }
}

impl fmt::Debug for StaticTokens {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("StaticTokens")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[async_trait]
impl TokenProvider for StaticTokens {
    async fn access_token(&self) -> Option<String> {
        self.token.clone()
    }

    async fn refresh(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_tokens_redact_debug_output() {
        let tokens = StaticTokens::new("secret-token");
        let rendered = format!("{tokens:?}");
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[tokio::test]
    async fn signed_out_provider_has_no_token_and_cannot_refresh() {
        let tokens = StaticTokens::signed_out();
        assert_eq!(tokens.access_token().await, None);
        assert!(!tokens.refresh().await);
    }
}
