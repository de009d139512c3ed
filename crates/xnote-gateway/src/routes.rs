use std::sync::Arc;

use axum::extract::rejection::{FormRejection, JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Form, Path, Query, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::trace::TraceLayer;

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::upstream::{compact_body, sanitize, UpstreamBody, UpstreamClient, UpstreamResponse};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    upstream: Arc<UpstreamClient>,
}

impl AppState {
    pub fn from_config(config: Arc<GatewayConfig>) -> Result<Self, GatewayError> {
        Ok(Self {
            upstream: Arc::new(UpstreamClient::new(&config)?),
            config,
        })
    }
}

pub fn app_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/notes", get(list_notes).post(create_note))
        .route(
            "/notes/{id}",
            get(get_note).put(update_note).delete(delete_note),
        )
        .route("/notes/{id}/analyze", get(analyze_note))
        .route("/token", post(issue_token));

    Router::new()
        .route("/healthz", get(healthz))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
    upstream: String,
}

async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
        upstream: state.upstream.base_url().to_string(),
    })
}

/// Bearer token to forward, if the caller sent a well-formed one.
///
/// Anything else is dropped so the upstream decides how to treat an
/// anonymous request.
pub fn forwarded_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get("authorization")?.to_str().ok()?;
    let (scheme, token) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        tracing::debug!("Ignoring non-bearer Authorization header");
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

/// Whether an upstream 404 should be rewritten to the stable not-found body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Collection,
    Resource,
}

/// Turn an upstream response into the client-facing one.
fn relay(response: UpstreamResponse, scope: Scope) -> Result<Response, GatewayError> {
    let UpstreamResponse { status, body } = response;
    if scope == Scope::Resource && status == StatusCode::NOT_FOUND {
        return Err(GatewayError::NotFound);
    }
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(status.into_response());
    }

    let payload: Value = serde_json::from_slice(&body).map_err(|error| {
        GatewayError::InvalidUpstreamBody(format!(
            "HTTP {}: {} ({})",
            status.as_u16(),
            sanitize(&error),
            compact_body(&body)
        ))
    })?;
    Ok((status, Json(payload)).into_response())
}

async fn forward(
    state: &AppState,
    method: Method,
    path: &str,
    headers: &HeaderMap,
    body: UpstreamBody,
    scope: Scope,
) -> Result<Response, GatewayError> {
    let response = state
        .upstream
        .forward(method, path, forwarded_bearer(headers), body)
        .await?;
    relay(response, scope)
}

fn note_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, GatewayError> {
    path.map(|Path(id)| id).map_err(|rejection| {
        GatewayError::bad_request(format!("Invalid note id: {}", rejection.body_text()))
    })
}

fn json_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, GatewayError> {
    body.map(|Json(value)| value).map_err(|rejection| {
        GatewayError::bad_request(format!("Invalid JSON body: {}", rejection.body_text()))
    })
}

async fn list_notes(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, GatewayError> {
    forward(
        &state,
        Method::GET,
        "/notes/",
        &headers,
        UpstreamBody::Empty,
        Scope::Collection,
    )
    .await
}

async fn create_note(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, GatewayError> {
    let body = json_body(body)?;
    forward(
        &state,
        Method::POST,
        "/notes/",
        &headers,
        UpstreamBody::Json(body),
        Scope::Collection,
    )
    .await
}

#[derive(Debug, Default, Deserialize)]
struct NoteQuery {
    analyze: Option<String>,
}

async fn get_note(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<i64>, PathRejection>,
    query: Result<Query<NoteQuery>, QueryRejection>,
) -> Result<Response, GatewayError> {
    let id = note_id(path)?;
    let analyze = query
        .map(|Query(query)| query)
        .unwrap_or_default()
        .analyze
        .is_some_and(|value| value == "true");
    let upstream_path = if analyze {
        format!("/notes/{id}/analyze")
    } else {
        format!("/notes/{id}")
    };
    forward(
        &state,
        Method::GET,
        &upstream_path,
        &headers,
        UpstreamBody::Empty,
        Scope::Resource,
    )
    .await
}

async fn update_note(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, GatewayError> {
    let id = note_id(path)?;
    let body = json_body(body)?;
    forward(
        &state,
        Method::PUT,
        &format!("/notes/{id}"),
        &headers,
        UpstreamBody::Json(body),
        Scope::Resource,
    )
    .await
}

async fn delete_note(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Response, GatewayError> {
    let id = note_id(path)?;
    forward(
        &state,
        Method::DELETE,
        &format!("/notes/{id}"),
        &headers,
        UpstreamBody::Empty,
        Scope::Resource,
    )
    .await
}

async fn analyze_note(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Response, GatewayError> {
    let id = note_id(path)?;
    forward(
        &state,
        Method::GET,
        &format!("/notes/{id}/analyze"),
        &headers,
        UpstreamBody::Empty,
        Scope::Resource,
    )
    .await
}

async fn issue_token(
    State(state): State<AppState>,
    form: Result<Form<Vec<(String, String)>>, FormRejection>,
) -> Result<Response, GatewayError> {
    let Form(fields) = form.map_err(|rejection| {
        GatewayError::bad_request(format!("Invalid form body: {}", rejection.body_text()))
    })?;
    let response = state
        .upstream
        .forward(Method::POST, "/token", None, UpstreamBody::Form(fields))
        .await?;
    if response.status.is_success() {
        tracing::info!("Issued access token");
    }
    relay(response, Scope::Collection)
}
