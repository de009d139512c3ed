//! Client configuration.
//!
//! Resolves where the gateway lives, how long a request may take, and where
//! the session token is persisted. Values come from the environment and can
//! be overridden by front-ends.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::util::{normalize_http_origin, normalize_text_option};

pub const DEFAULT_GATEWAY_URL: &str = "http://127.0.0.1:3000";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Gateway origin, without trailing slash
    pub gateway_url: String,
    /// Upper bound for a single request
    pub request_timeout: Duration,
    /// Explicit token file location, if any
    pub token_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            token_path: None,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let gateway_url = match normalize_text_option(lookup("XNOTE_GATEWAY_URL")) {
            Some(url) => normalize_gateway_url(&url)?,
            None => DEFAULT_GATEWAY_URL.to_string(),
        };

        let timeout_secs = match normalize_text_option(lookup("XNOTE_REQUEST_TIMEOUT_SECS")) {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                Error::Config("XNOTE_REQUEST_TIMEOUT_SECS must be an integer in [1, 120]".to_string())
            })?,
            None => DEFAULT_REQUEST_TIMEOUT_SECS,
        };
        if !(1..=120).contains(&timeout_secs) {
            return Err(Error::Config(
                "XNOTE_REQUEST_TIMEOUT_SECS must be in [1, 120]".to_string(),
            ));
        }

        let token_path = normalize_text_option(lookup("XNOTE_TOKEN_PATH")).map(PathBuf::from);

        Ok(Self {
            gateway_url,
            request_timeout: Duration::from_secs(timeout_secs),
            token_path,
        })
    }

    /// Replace the gateway origin, validating it like the environment value.
    pub fn with_gateway_url(mut self, url: &str) -> Result<Self> {
        self.gateway_url = normalize_gateway_url(url)?;
        Ok(self)
    }

    #[must_use]
    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = Some(path.into());
        self
    }

    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Base URL of the gateway's `/api` surface.
    #[must_use]
    pub fn api_base_url(&self) -> String {
        format!("{}/api", self.gateway_url)
    }
}

fn normalize_gateway_url(raw: &str) -> Result<String> {
    if raw.trim().is_empty() {
        return Err(Error::Config("gateway URL must not be empty".to_string()));
    }
    normalize_http_origin(raw).ok_or_else(|| {
        Error::Config("gateway URL must start with http:// or https://".to_string())
    })
}
