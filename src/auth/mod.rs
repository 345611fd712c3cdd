//! Authentication for Giant.
//!
//! OAuth 2.0 authorization code flow against Google, token storage, and the
//! credential resolution used at desktop startup.

mod oauth;
mod provider;
mod token_store;

pub use oauth::{OAuthClient, OAuthConfig, OAuthToken};
pub use provider::{AccessTokenProvider, RefreshingToken, StaticToken};
pub use token_store::TokenStore;

use crate::config::OAuthSettings;
use crate::error::{GiantError, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Environment variable holding a ready-made access token.
pub const ACCESS_TOKEN_ENV: &str = "GIANT_ACCESS_TOKEN";

/// Resolves the access token source for the desktop client.
///
/// Tries, in order: `GIANT_ACCESS_TOKEN`, a stored unexpired token, a stored
/// refresh token, then the interactive browser flow. Unless the token came
/// from the environment, it is refreshed from the store as it expires.
pub async fn resolve_token_provider(
    settings: &OAuthSettings,
    store: Arc<TokenStore>,
) -> Result<Arc<dyn AccessTokenProvider>> {
    let env_token = std::env::var(ACCESS_TOKEN_ENV).ok();
    let from_env = env_token.as_deref().is_some_and(|t| !t.trim().is_empty());
    let client = match OAuthConfig::from_settings(settings) {
        Ok(config) => Some(OAuthClient::new(config)),
        Err(e) => {
            warn!("OAuth unavailable: {e}");
            None
        }
    };

    let token = resolve_with(env_token, client.as_ref(), &store, true).await?;
    Ok(match client {
        Some(client) if !from_env => Arc::new(RefreshingToken::new(store, client)),
        _ => Arc::new(StaticToken::new(token)),
    })
}

async fn resolve_with(
    env_token: Option<String>,
    client: Option<&OAuthClient>,
    store: &TokenStore,
    interactive: bool,
) -> Result<String> {
    if let Some(token) = env_token.filter(|t| !t.trim().is_empty()) {
        info!("Using access token from {ACCESS_TOKEN_ENV}");
        return Ok(token);
    }

    let stored = store.load()?;
    if let Some(token) = stored.as_ref().filter(|t| !t.is_expired()) {
        return Ok(token.access_token.clone());
    }

    let client = client.ok_or_else(|| {
        GiantError::config(format!(
            "No credentials: set {ACCESS_TOKEN_ENV} or configure an OAuth client id"
        ))
    })?;

    if let Some(refresh_token) = stored.and_then(|t| t.refresh_token) {
        match client.refresh(&refresh_token).await {
            Ok(token) => {
                store.save(&token)?;
                return Ok(token.access_token);
            }
            Err(e) => warn!("Token refresh failed, signing in again: {e}"),
        }
    }

    if !interactive {
        return Err(GiantError::auth("Sign-in required"));
    }

    let token = client.authorize_interactive().await?;
    store.save(&token)?;
    Ok(token.access_token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn stored(expires_in_secs: i64, refresh: Option<&str>) -> OAuthToken {
        OAuthToken {
            access_token: "stored-token".to_string(),
            token_type: "Bearer".to_string(),
            expires_at: Some(Utc::now() + chrono::Duration::seconds(expires_in_secs)),
            refresh_token: refresh.map(String::from),
            scope: None,
        }
    }

    #[tokio::test]
    async fn test_env_token_wins() {
        let store = TokenStore::in_memory();
        store.save(&stored(3600, None)).unwrap();

        let token = resolve_with(Some("env-token".into()), None, &store, false)
            .await
            .unwrap();
        assert_eq!(token, "env-token");
    }

    #[tokio::test]
    async fn test_stored_unexpired_token() {
        let store = TokenStore::in_memory();
        store.save(&stored(3600, None)).unwrap();

        let token = resolve_with(Some("  ".into()), None, &store, false)
            .await
            .unwrap();
        assert_eq!(token, "stored-token");
    }

    #[tokio::test]
    async fn test_expired_without_client_is_config_error() {
        let store = TokenStore::in_memory();
        store.save(&stored(-10, Some("refresh"))).unwrap();

        let err = resolve_with(None, None, &store, false).await.unwrap_err();
        assert_eq!(err.category(), "Configuration Error");
    }
}
