//! Credential lookup for the hub connection
//!
//! The client never owns token refresh. It reads the current bearer token
//! from a [`TokenProvider`] at every reconnect attempt, so a token refreshed
//! between attempts is picked up automatically.

use async_trait::async_trait;
use tokio::sync::RwLock;

/// Source of the current bearer credential
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Current bearer token, or `None` when the user is signed out
    async fn bearer_token(&self) -> Option<String>;
}

/// Token store backed by process memory, updated on login/refresh/logout
pub struct InMemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self {
            token: RwLock::new(None),
        }
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }

    pub async fn set_token(&self, token: impl Into<String>) {
        *self.token.write().await = Some(token.into());
    }

    pub async fn clear(&self) {
        *self.token.write().await = None;
    }
}

impl Default for InMemoryTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenProvider for InMemoryTokenStore {
    async fn bearer_token(&self) -> Option<String> {
        self.token.read().await.clone()
    }
}
