use std::collections::HashMap;
use std::env;
use std::time::Duration;

use thiserror::Error;
use xnote_core::util::{normalize_http_origin, normalize_text_option};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub bind_addr: String,
    pub upstream_url: String,
    pub upstream_timeout: Duration,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = value_or_default(&lookup, "XNOTE_GATEWAY_BIND_ADDR", "127.0.0.1:3000");

        let upstream_url = normalize_http_origin(&value_or_default(
            &lookup,
            "XNOTE_UPSTREAM_URL",
            "http://localhost:8000",
        ))
        .ok_or_else(|| {
            ConfigError::Invalid(
                "XNOTE_UPSTREAM_URL must start with http:// or https://".to_string(),
            )
        })?;

        let timeout_secs = value_or_default(&lookup, "XNOTE_UPSTREAM_TIMEOUT_SECS", "10")
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::Invalid(
                    "XNOTE_UPSTREAM_TIMEOUT_SECS must be an integer in [1, 120]".to_string(),
                )
            })?;
        if !(1..=120).contains(&timeout_secs) {
            return Err(ConfigError::Invalid(
                "XNOTE_UPSTREAM_TIMEOUT_SECS must be in [1, 120]".to_string(),
            ));
        }

        Ok(Self {
            bind_addr,
            upstream_url,
            upstream_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    normalize_text_option(lookup(name)).unwrap_or_else(|| default.to_string())
}
