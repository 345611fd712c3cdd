//! OAuth 2.0 authorization code flow against Google.
//!
//! Covers building the consent URL, exchanging the returned code, refreshing
//! tokens, and the loopback flow used by the desktop client.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tracing::{debug, info};
use url::Url;

use crate::config::{OAuthSettings, BIGQUERY_SCOPE, GOOGLE_AUTH_URL, GOOGLE_TOKEN_URL};
use crate::error::{GiantError, Result};

/// Parameters of the OAuth client registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub auth_url: String,
    pub token_url: String,
    pub scopes: Vec<String>,
}

impl OAuthConfig {
    /// Builds the Google configuration from settings. A client id is required.
    pub fn from_settings(settings: &OAuthSettings) -> Result<Self> {
        let client_id = settings
            .client_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                GiantError::config("OAuth client id missing (set GOOGLE_CLIENT_ID)")
            })?;

        Ok(Self {
            client_id,
            client_secret: settings.client_secret.clone(),
            redirect_uri: settings.redirect_uri().to_string(),
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            scopes: vec![BIGQUERY_SCOPE.to_string()],
        })
    }
}

/// Tokens returned by the token endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthToken {
    pub access_token: String,
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl OAuthToken {
    /// True once the token is within a minute of expiry. Tokens without an
    /// expiry never expire.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            None => false,
            Some(expires_at) => Utc::now() + chrono::Duration::seconds(60) >= expires_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl TokenResponse {
    fn into_token(self) -> OAuthToken {
        let expires_at = self.expires_in.and_then(expiry_after);

        OAuthToken {
            access_token: self.access_token,
            token_type: self.token_type,
            expires_at,
            refresh_token: self.refresh_token,
            scope: self.scope,
        }
    }
}

/// Expiry `secs` from now; `None` when that is out of range, i.e. no expiry.
fn expiry_after(secs: u64) -> Option<DateTime<Utc>> {
    let secs = i64::try_from(secs).ok()?;
    let lifetime = chrono::Duration::try_seconds(secs)?;
    Utc::now().checked_add_signed(lifetime)
}

/// OAuth client for one registration.
///
/// Remembers the `state` of the last consent URL it produced so the callback
/// can be checked against it.
#[derive(Debug)]
pub struct OAuthClient {
    http: reqwest::Client,
    config: OAuthConfig,
    current_state: Mutex<Option<String>>,
}

impl OAuthClient {
    pub fn new(config: OAuthConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            current_state: Mutex::new(None),
        }
    }

    /// Builds the consent URL with a fresh random state.
    pub fn authorization_url(&self) -> Result<String> {
        let state = uuid::Uuid::new_v4().simple().to_string();

        let mut url = Url::parse(&self.config.auth_url)
            .map_err(|e| GiantError::auth(format!("Invalid authorization URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("scope", &self.config.scopes.join(" "))
            .append_pair("state", &state)
            .append_pair("prompt", "consent")
            .append_pair("access_type", "offline")
            .append_pair("include_granted_scopes", "true");

        let mut current = self
            .current_state
            .lock()
            .map_err(|_| GiantError::internal("OAuth state lock poisoned"))?;
        *current = Some(state);

        Ok(url.to_string())
    }

    /// Checks a callback `state` against the last issued one.
    pub fn verify_state(&self, state: &str) -> bool {
        self.current_state
            .lock()
            .map(|current| current.as_deref() == Some(state))
            .unwrap_or(false)
    }

    /// Exchanges an authorization code for tokens.
    ///
    /// When `state` is given it must match the last consent URL's state.
    pub async fn exchange_code(&self, code: &str, state: Option<&str>) -> Result<OAuthToken> {
        if let Some(state) = state {
            if !self.verify_state(state) {
                return Err(GiantError::auth("Invalid state parameter"));
            }
        }

        let mut params: HashMap<&str, &str> = HashMap::new();
        params.insert("grant_type", "authorization_code");
        params.insert("code", code);
        params.insert("redirect_uri", &self.config.redirect_uri);
        params.insert("client_id", &self.config.client_id);
        if let Some(secret) = &self.config.client_secret {
            params.insert("client_secret", secret);
        }

        let token = self.request_token(&params).await?;
        info!("Authorization code exchanged");
        Ok(token)
    }

    /// Exchanges a refresh token for a new access token.
    ///
    /// Google omits the refresh token from refresh responses, so the old one
    /// is carried over.
    pub async fn refresh(&self, refresh_token: &str) -> Result<OAuthToken> {
        let mut params: HashMap<&str, &str> = HashMap::new();
        params.insert("grant_type", "refresh_token");
        params.insert("refresh_token", refresh_token);
        params.insert("client_id", &self.config.client_id);
        if let Some(secret) = &self.config.client_secret {
            params.insert("client_secret", secret);
        }

        let mut token = self.request_token(&params).await?;
        if token.refresh_token.is_none() {
            token.refresh_token = Some(refresh_token.to_string());
        }
        debug!("Access token refreshed");
        Ok(token)
    }

    async fn request_token(&self, params: &HashMap<&str, &str>) -> Result<OAuthToken> {
        let response = self
            .http
            .post(&self.config.token_url)
            .form(params)
            .send()
            .await
            .map_err(|e| GiantError::auth(format!("Token request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GiantError::auth(format!(
                "Token endpoint returned {status}: {body}"
            )));
        }

        let raw: TokenResponse = response
            .json()
            .await
            .map_err(|e| GiantError::auth(format!("Failed to parse token response: {e}")))?;

        Ok(raw.into_token())
    }

    /// Runs the loopback flow: opens the consent page, waits for the browser
    /// redirect on the redirect URI's port, then exchanges the code.
    pub async fn authorize_interactive(&self) -> Result<OAuthToken> {
        let redirect = Url::parse(&self.config.redirect_uri)
            .map_err(|e| GiantError::config(format!("Invalid redirect URI: {e}")))?;
        let host = redirect.host_str().unwrap_or("127.0.0.1");
        let port = redirect
            .port_or_known_default()
            .ok_or_else(|| GiantError::config("Redirect URI has no port"))?;

        let listener = TcpListener::bind((host, port))
            .await
            .map_err(|e| GiantError::auth(format!("Failed to bind redirect listener: {e}")))?;

        let auth_url = self.authorization_url()?;
        eprintln!("Open the following URL in your browser to authorize Giant:\n{auth_url}");
        try_open_browser(&auth_url);

        let (code, state) = accept_callback(listener).await?;
        self.exchange_code(&code, Some(&state)).await
    }
}

/// Waits for one redirect request and returns its `(code, state)`.
async fn accept_callback(listener: TcpListener) -> Result<(String, String)> {
    let (stream, _) = listener
        .accept()
        .await
        .map_err(|e| GiantError::auth(format!("Failed to accept OAuth callback: {e}")))?;

    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();
    let request_line = lines
        .next_line()
        .await
        .map_err(|e| GiantError::auth(format!("Failed to read OAuth callback: {e}")))?
        .unwrap_or_default();

    let response = "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nConnection: close\r\n\r\nAuthorization complete. You may close this tab.";
    let _ = write_half.write_all(response.as_bytes()).await;

    parse_callback(&request_line)
}

/// Extracts `code` and `state` from a request line like
/// `GET /oauth-callback?code=...&state=... HTTP/1.1`.
fn parse_callback(request_line: &str) -> Result<(String, String)> {
    let target = request_line.split_whitespace().nth(1).unwrap_or("/");
    let url = Url::parse(&format!("http://localhost{target}"))
        .map_err(|e| GiantError::auth(format!("Malformed OAuth callback: {e}")))?;
    let params: HashMap<String, String> = url.query_pairs().into_owned().collect();

    if let Some(error) = params.get("error") {
        return Err(GiantError::auth(format!("Authorization denied: {error}")));
    }

    let code = params
        .get("code")
        .cloned()
        .ok_or_else(|| GiantError::auth("OAuth callback has no code"))?;
    let state = params.get("state").cloned().unwrap_or_default();
    Ok((code, state))
}

fn try_open_browser(url: &str) {
    #[cfg(target_os = "macos")]
    {
        let _ = std::process::Command::new("open").arg(url).spawn();
    }
    #[cfg(target_os = "linux")]
    {
        let _ = std::process::Command::new("xdg-open").arg(url).spawn();
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        let _ = url;
    }
}
