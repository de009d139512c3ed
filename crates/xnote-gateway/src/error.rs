use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Note not found")]
    NotFound,
    #[error("Upstream request timed out")]
    UpstreamTimeout,
    #[error("Upstream request failed: {0}")]
    Upstream(String),
    #[error("Upstream returned an unreadable body: {0}")]
    InvalidUpstreamBody(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
}

impl GatewayError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream(message.into())
    }

    const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            Self::Upstream(_) | Self::InvalidUpstreamBody(_) | Self::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Client-facing message. Internal causes are logged, never returned.
    fn detail(&self) -> String {
        match self {
            Self::BadRequest(message) => message.clone(),
            Self::NotFound | Self::UpstreamTimeout => self.to_string(),
            Self::Upstream(_) | Self::InvalidUpstreamBody(_) | Self::Config(_) => {
                "Internal server error".to_string()
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "Gateway request failed");
        }
        let body = ErrorBody {
            detail: self.detail(),
        };
        (status, Json(body)).into_response()
    }
}
