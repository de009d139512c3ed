//! Client-side transport to the Xnote gateway.
//!
//! [`NotesApi`] is the seam between the data layer and the network. The
//! production implementation, [`GatewayClient`], attaches the bearer token,
//! bounds every request with a timeout, and turns each outcome into either a
//! typed value or an [`Error`]. A 401 from any guarded call clears the
//! session and fires the login redirect before the error is returned.

use std::future::Future;

use reqwest::header::ACCEPT;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::auth::{AccessToken, Credentials, SessionGuard};
use crate::config::ClientConfig;
use crate::error::{Error, NetworkFailure, Result};
use crate::models::{Note, NoteAnalysis, NoteDraft, NoteId, Sentiment};
use crate::util::compact_text;

/// Request surface of the remote note store.
pub trait NotesApi: Send + Sync {
    fn list_notes(&self) -> impl Future<Output = Result<Vec<Note>>> + Send;

    fn get_note(&self, id: NoteId) -> impl Future<Output = Result<Note>> + Send;

    fn create_note(&self, draft: &NoteDraft) -> impl Future<Output = Result<Note>> + Send;

    fn update_note(
        &self,
        id: NoteId,
        draft: &NoteDraft,
    ) -> impl Future<Output = Result<Note>> + Send;

    fn delete_note(&self, id: NoteId) -> impl Future<Output = Result<()>> + Send;

    fn analyze_note(&self, id: NoteId) -> impl Future<Output = Result<Sentiment>> + Send;

    fn request_token(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<AccessToken>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnauthorizedPolicy {
    /// 401 means the session is dead: clear it and redirect.
    ExpireSession,
    /// 401 is an ordinary failure (wrong password on login).
    Report,
}

/// HTTP client for the gateway's `/api` surface.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    base_url: String,
    client: Client,
    session: SessionGuard,
}

impl GatewayClient {
    pub fn new(config: &ClientConfig, session: SessionGuard) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|error| Error::Config(format!("failed to build HTTP client: {error}")))?;

        Ok(Self {
            base_url: config.api_base_url(),
            client,
            session,
        })
    }

    #[must_use]
    pub const fn session(&self) -> &SessionGuard {
        &self.session
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn execute(
        &self,
        request: RequestBuilder,
        policy: UnauthorizedPolicy,
    ) -> Result<Response> {
        let response = request
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|error| transport_error(&error))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED && policy == UnauthorizedPolicy::ExpireSession {
            self.session.expire();
            return Err(Error::Unauthorized);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::debug!(
            status = status.as_u16(),
            body = %compact_text(&body),
            "Gateway request failed"
        );
        Err(status_error(status, &body))
    }

    async fn execute_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        policy: UnauthorizedPolicy,
    ) -> Result<T> {
        let response = self.execute(request, policy).await?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|error| transport_error(&error))?;

        serde_json::from_slice(&bytes).map_err(|error| {
            tracing::warn!(status = status.as_u16(), %error, "Gateway returned a malformed body");
            Error::Server {
                status: status.as_u16(),
                detail: format!("Malformed response: {error}"),
            }
        })
    }
}

impl NotesApi for GatewayClient {
    async fn list_notes(&self) -> Result<Vec<Note>> {
        let request = self.authorized(self.client.get(self.endpoint("/notes")));
        self.execute_json(request, UnauthorizedPolicy::ExpireSession)
            .await
    }

    async fn get_note(&self, id: NoteId) -> Result<Note> {
        let request = self.authorized(self.client.get(self.endpoint(&format!("/notes/{id}"))));
        self.execute_json(request, UnauthorizedPolicy::ExpireSession)
            .await
    }

    async fn create_note(&self, draft: &NoteDraft) -> Result<Note> {
        let request = self.authorized(self.client.post(self.endpoint("/notes")).json(draft));
        self.execute_json(request, UnauthorizedPolicy::ExpireSession)
            .await
    }

    async fn update_note(&self, id: NoteId, draft: &NoteDraft) -> Result<Note> {
        let request = self.authorized(
            self.client
                .put(self.endpoint(&format!("/notes/{id}")))
                .json(draft),
        );
        self.execute_json(request, UnauthorizedPolicy::ExpireSession)
            .await
    }

    async fn delete_note(&self, id: NoteId) -> Result<()> {
        let request =
            self.authorized(self.client.delete(self.endpoint(&format!("/notes/{id}"))));
        self.execute(request, UnauthorizedPolicy::ExpireSession)
            .await?;
        Ok(())
    }

    async fn analyze_note(&self, id: NoteId) -> Result<Sentiment> {
        let request = self.authorized(
            self.client
                .get(self.endpoint(&format!("/notes/{id}/analyze"))),
        );
        let analysis: NoteAnalysis = self
            .execute_json(request, UnauthorizedPolicy::ExpireSession)
            .await?;
        Ok(analysis.sentiment)
    }

    async fn request_token(&self, credentials: &Credentials) -> Result<AccessToken> {
        let form = [
            ("username", credentials.username.as_str()),
            ("password", credentials.password.as_str()),
        ];
        let request = self.client.post(self.endpoint("/token")).form(&form);
        self.execute_json(request, UnauthorizedPolicy::Report).await
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    detail: Option<Value>,
}

/// Extract a readable message from a `{"detail": ...}` envelope.
///
/// String details are used verbatim; validation-style arrays are reduced to
/// their `msg` fields.
fn parse_detail(body: &str) -> Option<String> {
    let envelope = serde_json::from_str::<ErrorEnvelope>(body).ok()?;
    match envelope.detail? {
        Value::String(message) => Some(message.trim().to_string()),
        Value::Array(items) => {
            let messages: Vec<String> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .map(str::to_string)
                .collect();
            if messages.is_empty() {
                Some(Value::Array(items).to_string())
            } else {
                Some(messages.join("; "))
            }
        }
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn status_error(status: StatusCode, body: &str) -> Error {
    let detail = parse_detail(body).unwrap_or_else(|| compact_text(body));
    match status {
        StatusCode::NOT_FOUND => Error::NotFound(if detail.is_empty() {
            "Note not found".to_string()
        } else {
            detail
        }),
        StatusCode::GATEWAY_TIMEOUT => Error::Network(NetworkFailure::Timeout),
        _ => Error::Server {
            status: status.as_u16(),
            detail,
        },
    }
}

fn transport_error(error: &reqwest::Error) -> Error {
    if error.is_timeout() {
        tracing::warn!("Request timeout: the gateway took too long to respond");
        return Error::Network(NetworkFailure::Timeout);
    }
    if error.is_decode() {
        return Error::Server {
            status: error.status().map_or(0, |status| status.as_u16()),
            detail: format!("Malformed response: {error}"),
        };
    }
    tracing::warn!(%error, "Network error: the gateway is unreachable");
    Error::Network(NetworkFailure::Unreachable)
}
