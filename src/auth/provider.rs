//! Access tokens for warehouse requests.
//!
//! The desktop client runs for longer than a Google access token lives, so
//! requests ask a provider for the token each time instead of holding one.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::{OAuthClient, TokenStore};
use crate::error::{GiantError, Result};

/// Source of the bearer token sent with each warehouse request.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// A token that is used as-is, e.g. one passed in by a caller.
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl AccessTokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Serves the stored token and refreshes it once it expires.
///
/// A rejected refresh clears the store so the next start signs in again.
pub struct RefreshingToken {
    store: Arc<TokenStore>,
    client: OAuthClient,
    refreshing: Mutex<()>,
}

impl RefreshingToken {
    pub fn new(store: Arc<TokenStore>, client: OAuthClient) -> Self {
        Self {
            store,
            client,
            refreshing: Mutex::new(()),
        }
    }
}

#[async_trait]
impl AccessTokenProvider for RefreshingToken {
    async fn access_token(&self) -> Result<String> {
        // Concurrent requests wait here so only one of them refreshes
        let _guard = self.refreshing.lock().await;

        let stored = self
            .store
            .load()?
            .ok_or_else(|| GiantError::auth("Not signed in; restart Giant to sign in"))?;
        if !stored.is_expired() {
            return Ok(stored.access_token);
        }

        let refresh_token = stored.refresh_token.ok_or_else(|| {
            GiantError::auth("Access token expired; restart Giant to sign in again")
        })?;

        match self.client.refresh(&refresh_token).await {
            Ok(token) => {
                self.store.save(&token)?;
                info!("Access token refreshed");
                Ok(token.access_token)
            }
            Err(e) => {
                warn!("Token refresh failed: {e}");
                self.store.clear()?;
                Err(GiantError::auth(
                    "Access token expired and could not be refreshed; restart Giant to sign in again",
                ))
            }
        }
    }
}
