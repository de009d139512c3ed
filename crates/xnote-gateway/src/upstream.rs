use axum::body::Bytes;
use axum::http::{Method, StatusCode};
use serde_json::Value;

use crate::config::GatewayConfig;
use crate::error::GatewayError;

/// Body forwarded to the upstream note store.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamBody {
    Empty,
    Json(Value),
    Form(Vec<(String, String)>),
}

#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

/// Forwards gateway requests to the configured note store.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    base_url: String,
}

impl UpstreamClient {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(config.upstream_timeout)
            .build()
            .map_err(|error| {
                GatewayError::Config(format!(
                    "failed to build upstream client: {}",
                    sanitize(&error)
                ))
            })?;

        Ok(Self {
            client,
            base_url: config.upstream_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn forward(
        &self,
        method: Method,
        path: &str,
        bearer: Option<&str>,
        body: UpstreamBody,
    ) -> Result<UpstreamResponse, GatewayError> {
        let url = format!("{}{path}", self.base_url);
        let mut request = self
            .client
            .request(method.clone(), &url)
            .header("Accept", "application/json");
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        request = match body {
            UpstreamBody::Empty => request,
            UpstreamBody::Json(value) => request.json(&value),
            UpstreamBody::Form(fields) => request.form(&fields),
        };

        let response = request.send().await.map_err(|error| classify(&error))?;
        let status = response.status();
        let body = response.bytes().await.map_err(|error| classify(&error))?;

        tracing::debug!(
            method = %method,
            path,
            status = status.as_u16(),
            bytes = body.len(),
            "Upstream responded"
        );
        Ok(UpstreamResponse { status, body })
    }
}

fn classify(error: &reqwest::Error) -> GatewayError {
    if error.is_timeout() {
        tracing::warn!("Upstream request timed out");
        GatewayError::UpstreamTimeout
    } else {
        GatewayError::upstream(sanitize(error))
    }
}

pub fn sanitize(error: &impl std::fmt::Display) -> String {
    error.to_string().replace('\n', " ").trim().to_string()
}

pub fn compact_body(body: &[u8]) -> String {
    String::from_utf8_lossy(body).trim().chars().take(180).collect()
}
