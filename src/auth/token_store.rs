//! OAuth token storage using the OS keyring.
//!
//! Tokens are serialized to JSON and stored under the `giant` service. When
//! the keyring is unavailable the token lives in memory for the session only.

use super::OAuthToken;
use crate::error::{GiantError, Result};
use keyring::Entry;
use std::sync::Mutex;
use tracing::warn;

const SERVICE_NAME: &str = "giant";
const TOKEN_KEY: &str = "oauth-token";

/// Stores the OAuth token between runs.
#[derive(Debug)]
pub struct TokenStore {
    keyring_available: bool,
    memory: Mutex<Option<OAuthToken>>,
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStore {
    /// Creates a store, probing keyring availability.
    pub fn new() -> Self {
        let keyring_available = Self::probe_keyring();
        if !keyring_available {
            warn!("OS keyring unavailable; OAuth tokens will not persist between runs");
        }
        Self::with_keyring(keyring_available)
    }

    /// Creates a store that never touches the keyring.
    pub fn in_memory() -> Self {
        Self::with_keyring(false)
    }

    fn with_keyring(keyring_available: bool) -> Self {
        Self {
            keyring_available,
            memory: Mutex::new(None),
        }
    }

    fn probe_keyring() -> bool {
        let entry = match Entry::new(SERVICE_NAME, "__probe__") {
            Ok(e) => e,
            Err(_) => return false,
        };

        match entry.set_password("probe") {
            Ok(()) => {
                let _ = entry.delete_credential();
                true
            }
            Err(_) => false,
        }
    }

    fn entry() -> Result<Entry> {
        Entry::new(SERVICE_NAME, TOKEN_KEY)
            .map_err(|e| GiantError::auth(format!("Failed to access keyring: {e}")))
    }

    /// Saves the token, replacing any previous one.
    pub fn save(&self, token: &OAuthToken) -> Result<()> {
        if let Ok(mut memory) = self.memory.lock() {
            *memory = Some(token.clone());
        }

        if !self.keyring_available {
            return Ok(());
        }

        let json = serde_json::to_string(token)
            .map_err(|e| GiantError::auth(format!("Failed to serialize token: {e}")))?;
        Self::entry()?
            .set_password(&json)
            .map_err(|e| GiantError::auth(format!("Failed to store token: {e}")))
    }

    /// Loads the stored token, if any.
    pub fn load(&self) -> Result<Option<OAuthToken>> {
        if let Some(token) = self.memory.lock().ok().and_then(|m| m.clone()) {
            return Ok(Some(token));
        }

        if !self.keyring_available {
            return Ok(None);
        }

        match Self::entry()?.get_password() {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(token) => Ok(Some(token)),
                Err(e) => {
                    warn!("Discarding unreadable stored token: {e}");
                    Ok(None)
                }
            },
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(GiantError::auth(format!("Failed to read token: {e}"))),
        }
    }

    /// Removes the stored token.
    pub fn clear(&self) -> Result<()> {
        if let Ok(mut memory) = self.memory.lock() {
            *memory = None;
        }

        if !self.keyring_available {
            return Ok(());
        }

        match Self::entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => {
                warn!("Failed to delete token from keyring: {e}");
                Ok(())
            }
        }
    }
}
