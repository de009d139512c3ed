//! Session guard: owns the access token and decides whether the client is
//! authenticated.
//!
//! The token lives behind a [`TokenPersistence`] backend. Whenever the session
//! turns out to be unusable (missing, expired, or rejected with 401) the guard
//! hands control to an injected [`LoginNavigator`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::api::NotesApi;
use crate::error::{Error, Result};
use crate::util::unix_timestamp_now;

/// Fixed key under which the token is persisted.
pub const TOKEN_STORAGE_KEY: &str = "token";

/// Storage backend for the single credential token.
pub trait TokenPersistence: Send + Sync + 'static {
    fn load_token(&self) -> Result<Option<String>>;
    fn save_token(&self, token: &str) -> Result<()>;
    fn clear_token(&self) -> Result<()>;
}

/// Navigation hook fired when the user must sign in again.
pub trait LoginNavigator: Send + Sync + 'static {
    fn redirect_to_login(&self);
}

impl<F> LoginNavigator for F
where
    F: Fn() + Send + Sync + 'static,
{
    fn redirect_to_login(&self) {
        self();
    }
}

/// Username/password pair submitted to the token endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Successful token endpoint response.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AccessToken")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenClaims {
    exp: Option<f64>,
}

/// Read the `exp` claim from a JWT without verifying its signature.
///
/// Returns `None` for anything that is not a three-segment token with a
/// base64url JSON payload carrying a numeric `exp`. Fractional seconds are
/// rounded down.
#[must_use]
pub fn decode_token_expiry(token: &str) -> Option<i64> {
    let mut segments = token.trim().split('.');
    let (Some(_header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return None;
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    let exp = serde_json::from_slice::<TokenClaims>(&bytes).ok()?.exp?;
    if !exp.is_finite() {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)] // saturates outside the i64 range
    let seconds = exp.floor() as i64;
    Some(seconds)
}

/// Single-owner session shared by the transport, store, and dialog.
#[derive(Clone)]
pub struct SessionGuard {
    store: Arc<dyn TokenPersistence>,
    navigator: Arc<dyn LoginNavigator>,
}

impl fmt::Debug for SessionGuard {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SessionGuard")
            .field("has_token", &self.token().is_some())
            .finish_non_exhaustive()
    }
}

impl SessionGuard {
    pub fn new(store: impl TokenPersistence, navigator: impl LoginNavigator) -> Self {
        Self {
            store: Arc::new(store),
            navigator: Arc::new(navigator),
        }
    }

    /// Currently stored token, if any. Storage failures read as "no token".
    #[must_use]
    pub fn token(&self) -> Option<String> {
        match self.store.load_token() {
            Ok(token) => token.filter(|value| !value.trim().is_empty()),
            Err(error) => {
                tracing::warn!(%error, "Failed to read persisted token");
                None
            }
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated_at(unix_timestamp_now())
    }

    fn is_authenticated_at(&self, now: i64) -> bool {
        let Some(token) = self.token() else {
            return false;
        };
        decode_token_expiry(&token).is_some_and(|exp| exp > now)
    }

    /// Expiry of the stored token, if it can be decoded.
    #[must_use]
    pub fn expires_at(&self) -> Option<i64> {
        self.token().as_deref().and_then(decode_token_expiry)
    }

    /// Exchange credentials for a token and persist it.
    ///
    /// Every failure (validation, transport, status, missing token, storage)
    /// yields `false`.
    pub async fn login<A: NotesApi>(&self, api: &A, credentials: &Credentials) -> bool {
        if credentials.username.trim().is_empty() || credentials.password.is_empty() {
            tracing::warn!("Login rejected locally: username and password are required");
            return false;
        }

        let token = match api.request_token(credentials).await {
            Ok(token) => token,
            Err(error) => {
                tracing::warn!(%error, "Login failed");
                return false;
            }
        };

        let access_token = token.access_token.trim();
        if access_token.is_empty() {
            tracing::warn!("Token response did not include an access token");
            return false;
        }

        match self.store.save_token(access_token) {
            Ok(()) => {
                tracing::info!(username = %credentials.username, "Login successful, token stored");
                true
            }
            Err(error) => {
                tracing::warn!(%error, "Failed to persist access token");
                false
            }
        }
    }

    /// Drop the persisted token. Safe to call repeatedly.
    pub fn logout(&self) {
        if let Err(error) = self.store.clear_token() {
            tracing::warn!(%error, "Failed to clear persisted token");
        }
    }

    /// Gate for every data operation.
    pub fn require_auth_or_redirect(&self) -> bool {
        if self.is_authenticated() {
            return true;
        }
        tracing::debug!("Session missing or expired, redirecting to login");
        self.navigator.redirect_to_login();
        false
    }

    /// Forced logout after the server rejected the credential.
    pub fn expire(&self) {
        tracing::info!("Server rejected the session, clearing token");
        self.logout();
        self.navigator.redirect_to_login();
    }

    pub(crate) fn ensure_authenticated(&self) -> Result<()> {
        if self.require_auth_or_redirect() {
            Ok(())
        } else {
            Err(Error::Unauthorized)
        }
    }
}

/// Process-local token store.
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenStore {
    token: Arc<Mutex<Option<String>>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Arc::new(Mutex::new(Some(token.into()))),
        }
    }
}

impl TokenPersistence for MemoryTokenStore {
    fn load_token(&self) -> Result<Option<String>> {
        let guard = self
            .token
            .lock()
            .map_err(|error| Error::Storage(error.to_string()))?;
        Ok(guard.clone())
    }

    fn save_token(&self, token: &str) -> Result<()> {
        let mut guard = self
            .token
            .lock()
            .map_err(|error| Error::Storage(error.to_string()))?;
        *guard = Some(token.to_string());
        Ok(())
    }

    fn clear_token(&self) -> Result<()> {
        let mut guard = self
            .token
            .lock()
            .map_err(|error| Error::Storage(error.to_string()))?;
        *guard = None;
        Ok(())
    }
}

/// Token store backed by a small JSON key/value file.
///
/// The token is kept under [`TOKEN_STORAGE_KEY`]; other keys in the file are
/// preserved. Every read goes to disk, so a logout from another process is
/// observed immediately.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let raw = std::fs::read_to_string(&self.path).map_err(|error| {
            Error::Storage(format!("failed to read {}: {error}", self.path.display()))
        })?;
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }
        serde_json::from_str(&raw).map_err(|error| {
            Error::Storage(format!("failed to parse {}: {error}", self.path.display()))
        })
    }

    fn write_entries(&self, entries: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                Error::Storage(format!(
                    "failed to create directory {}: {error}",
                    parent.display()
                ))
            })?;
        }
        let raw = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, format!("{raw}\n")).map_err(|error| {
            Error::Storage(format!("failed to write {}: {error}", self.path.display()))
        })
    }
}

impl TokenPersistence for FileTokenStore {
    fn load_token(&self) -> Result<Option<String>> {
        let entries = self.read_entries()?;
        Ok(entries
            .get(TOKEN_STORAGE_KEY)
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    fn save_token(&self, token: &str) -> Result<()> {
        let mut entries = self.read_entries()?;
        entries.insert(
            TOKEN_STORAGE_KEY.to_string(),
            Value::String(token.to_string()),
        );
        self.write_entries(&entries)
    }

    fn clear_token(&self) -> Result<()> {
        let mut entries = match self.read_entries() {
            Ok(entries) => entries,
            // An unreadable file cannot hold a usable token; start over.
            Err(_) if self.path.exists() => Map::new(),
            Err(error) => return Err(error),
        };
        if entries.remove(TOKEN_STORAGE_KEY).is_none() && !entries.is_empty() {
            return Ok(());
        }
        if entries.is_empty() {
            match std::fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(error) => Err(Error::Storage(format!(
                    "failed to remove {}: {error}",
                    self.path.display()
                ))),
            }
        } else {
            self.write_entries(&entries)
        }
    }
}
