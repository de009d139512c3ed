use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use clap::Parser;
use jsonwebtoken::{encode, EncodingKey, Header};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tempfile::TempDir;
use xnote_core::auth::{FileTokenStore, TokenPersistence};
use xnote_core::config::ClientConfig;
use xnote_core::util::unix_timestamp_now;
use xnote_core::{Note, NoteId, Sentiment};

use crate::cli::{AuthCommands, Cli, Commands};
use crate::commands::analyze::run_analyze;
use crate::commands::auth_cmd::run_auth;
use crate::commands::common::{format_note_detail, format_note_lines, note_to_list_item, Context};
use crate::commands::edit::{run_add, run_delete, run_edit};
use crate::commands::notes::{run_list, run_show};
use crate::error::CliError;
use crate::session::resolve_token_path;

#[derive(Default)]
struct FakeBackend {
    notes: Vec<Value>,
    next_id: i64,
    requests: usize,
}

type Shared = Arc<Mutex<FakeBackend>>;

async fn list_notes(State(backend): State<Shared>) -> Json<Value> {
    let mut backend = backend.lock().unwrap();
    backend.requests += 1;
    Json(Value::Array(backend.notes.clone()))
}

async fn create_note(
    State(backend): State<Shared>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let mut backend = backend.lock().unwrap();
    backend.requests += 1;
    backend.next_id += 1;
    let note = json!({
        "id": backend.next_id,
        "title": body["title"],
        "content": body["content"],
        "sentiment": null,
        "created_at": "2024-01-05T10:00:00",
        "updated_at": "2024-01-05T10:00:00"
    });
    backend.notes.push(note.clone());
    (StatusCode::CREATED, Json(note))
}

async fn get_note(
    State(backend): State<Shared>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, StatusCode> {
    let mut backend = backend.lock().unwrap();
    backend.requests += 1;
    backend
        .notes
        .iter()
        .find(|note| note["id"] == id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn update_note(
    State(backend): State<Shared>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    let mut backend = backend.lock().unwrap();
    backend.requests += 1;
    let note = backend
        .notes
        .iter_mut()
        .find(|note| note["id"] == id)
        .ok_or(StatusCode::NOT_FOUND)?;
    note["title"] = body["title"].clone();
    note["content"] = body["content"].clone();
    note["updated_at"] = json!("2024-01-06T09:30:00");
    Ok(Json(note.clone()))
}

async fn delete_note(State(backend): State<Shared>, Path(id): Path<i64>) -> StatusCode {
    let mut backend = backend.lock().unwrap();
    backend.requests += 1;
    let before = backend.notes.len();
    backend.notes.retain(|note| note["id"] != id);
    if backend.notes.len() == before {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::NO_CONTENT
    }
}

async fn analyze_note(
    State(backend): State<Shared>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, StatusCode> {
    let mut backend = backend.lock().unwrap();
    backend.requests += 1;
    let note = backend
        .notes
        .iter_mut()
        .find(|note| note["id"] == id)
        .ok_or(StatusCode::NOT_FOUND)?;
    note["sentiment"] = json!("positive");
    Ok(Json(json!({ "sentiment": "positive" })))
}

struct Harness {
    context: Context,
    backend: Shared,
    token_path: PathBuf,
    _dir: TempDir,
}

fn token_expiring_at(exp: i64) -> String {
    encode(
        &Header::default(),
        &json!({ "sub": "alice", "exp": exp }),
        &EncodingKey::from_secret(b"cli-test-secret"),
    )
    .unwrap()
}

async fn harness(signed_in: bool) -> Harness {
    let backend = Shared::default();
    let router = Router::new()
        .route("/api/notes", get(list_notes).post(create_note))
        .route(
            "/api/notes/{id}",
            get(get_note).put(update_note).delete(delete_note),
        )
        .route("/api/notes/{id}/analyze", get(analyze_note))
        .with_state(backend.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let dir = tempfile::tempdir().unwrap();
    let token_path = dir.path().join("session.json");
    if signed_in {
        FileTokenStore::new(&token_path)
            .save_token(&token_expiring_at(unix_timestamp_now() + 3_600))
            .unwrap();
    }
    let config = ClientConfig::default()
        .with_gateway_url(&format!("http://{addr}"))
        .unwrap();

    Harness {
        context: Context::new(&config, token_path.clone()).unwrap(),
        backend,
        token_path,
        _dir: dir,
    }
}

fn output(buffer: Vec<u8>) -> String {
    String::from_utf8(buffer).unwrap()
}

fn sample_note(sentiment: Option<Sentiment>) -> Note {
    Note {
        id: NoteId::new(7),
        title: "Meeting notes".to_string(),
        content: "Discuss the roadmap\nand hiring".to_string(),
        sentiment,
        created_at: "2024-01-05T10:20:30".to_string(),
        updated_at: "2024-02-01T08:00:00Z".to_string(),
    }
}

#[test]
fn cli_parses_edit_with_global_flags() {
    let cli = Cli::try_parse_from([
        "xnote",
        "edit",
        "3",
        "--title",
        "Renamed",
        "--gateway-url",
        "http://gw:3000",
    ])
    .unwrap();

    assert_eq!(cli.gateway_url.as_deref(), Some("http://gw:3000"));
    match cli.command {
        Commands::Edit { id, title, content } => {
            assert_eq!(id, NoteId::new(3));
            assert_eq!(title.as_deref(), Some("Renamed"));
            assert_eq!(content, None);
        }
        _ => panic!("expected edit command"),
    }
}

#[test]
fn cli_rejects_non_numeric_note_id() {
    assert!(Cli::try_parse_from(["xnote", "show", "abc"]).is_err());
}

#[test]
fn cli_parses_auth_login() {
    let cli = Cli::try_parse_from(["xnote", "auth", "login", "--username", "alice"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Auth {
            command: AuthCommands::Login { ref username, password: None }
        } if username == "alice"
    ));
}

#[test]
fn token_path_prefers_flag_then_env() {
    let config = ClientConfig::default().with_token_path("/tmp/from-env.json");

    let flagged = resolve_token_path(Some(PathBuf::from("/tmp/flag.json")), &config).unwrap();
    assert_eq!(flagged, PathBuf::from("/tmp/flag.json"));

    let from_env = resolve_token_path(None, &config).unwrap();
    assert_eq!(from_env, PathBuf::from("/tmp/from-env.json"));
}

#[test]
fn format_note_lines_shows_id_title_and_sentiment() {
    let lines = format_note_lines(&[sample_note(Some(Sentiment::Positive)), sample_note(None)]);

    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("Meeting notes"));
    assert!(lines[0].contains("[positive]"));
    assert!(lines[0].contains("Feb 1, 2024"));
    assert!(lines[0].contains("Discuss the roadmap and hiring"));
    assert!(lines[1].contains("[not analyzed]"));
}

#[test]
fn note_detail_and_list_item_render_fields() {
    let note = sample_note(Some(Sentiment::Negative));

    let detail = format_note_detail(&note);
    assert!(detail.starts_with("#7 Meeting notes\n"));
    assert!(detail.contains("Sentiment: negative"));
    assert!(detail.contains("Created: Jan 5, 2024"));

    let item = serde_json::to_value(note_to_list_item(&note)).unwrap();
    assert_eq!(item["id"], 7);
    assert_eq!(item["sentiment"], "negative");
    assert_eq!(item["created_at"], "2024-01-05T10:20:30");
}

#[tokio::test]
async fn add_then_list_round_trips_through_gateway() {
    let h = harness(true).await;

    let mut out = Vec::new();
    run_add(&h.context, "Trip plan", "Pack the tent and stove", &mut out)
        .await
        .unwrap();
    assert_eq!(output(out), "1\n");

    let mut out = Vec::new();
    run_list(&h.context, None, true, &mut out).await.unwrap();
    let items: Value = serde_json::from_str(&output(out)).unwrap();
    assert_eq!(items.as_array().unwrap().len(), 1);
    assert_eq!(items[0]["title"], "Trip plan");
}

#[tokio::test]
async fn list_search_filters_locally() {
    let h = harness(true).await;
    for (title, content) in [
        ("Grocery list", "Milk, eggs, and bread"),
        ("Meeting notes", "Discuss the roadmap"),
    ] {
        run_add(&h.context, title, content, &mut Vec::new())
            .await
            .unwrap();
    }

    let mut out = Vec::new();
    run_list(&h.context, Some("meet"), false, &mut out)
        .await
        .unwrap();
    let text = output(out);

    assert!(text.contains("Meeting notes"));
    assert!(!text.contains("Grocery list"));
}

#[tokio::test]
async fn invalid_add_never_reaches_gateway() {
    let h = harness(true).await;

    let err = run_add(&h.context, "Hi", "short", &mut Vec::new())
        .await
        .unwrap_err();

    assert_eq!(
        err.user_message(),
        "Content must be at least 10 characters long"
    );
    assert_eq!(h.backend.lock().unwrap().requests, 0);
}

#[tokio::test]
async fn edit_updates_note_and_show_prints_it() {
    let h = harness(true).await;
    run_add(&h.context, "Grocery list", "Milk, eggs, and bread", &mut Vec::new())
        .await
        .unwrap();

    let mut out = Vec::new();
    run_edit(&h.context, NoteId::new(1), Some("Groceries"), None, &mut out)
        .await
        .unwrap();
    assert_eq!(output(out), "1\n");
    assert_eq!(h.backend.lock().unwrap().notes[0]["title"], "Groceries");
    assert_eq!(
        h.backend.lock().unwrap().notes[0]["content"],
        "Milk, eggs, and bread"
    );

    let mut out = Vec::new();
    run_show(&h.context, NoteId::new(1), &mut out).await.unwrap();
    assert!(output(out).starts_with("#1 Groceries\n"));
}

#[tokio::test]
async fn edit_requires_a_change() {
    let h = harness(true).await;

    let err = run_edit(&h.context, NoteId::new(1), None, None, &mut Vec::new())
        .await
        .unwrap_err();

    assert!(matches!(err, CliError::NothingToEdit));
}

#[tokio::test]
async fn delete_and_show_missing_note_report_not_found() {
    let h = harness(true).await;
    run_add(&h.context, "Grocery list", "Milk, eggs, and bread", &mut Vec::new())
        .await
        .unwrap();

    let mut out = Vec::new();
    run_delete(&h.context, NoteId::new(1), &mut out).await.unwrap();
    assert_eq!(output(out), "1\n");
    assert!(h.backend.lock().unwrap().notes.is_empty());

    let err = run_delete(&h.context, NoteId::new(1), &mut Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, CliError::NoteNotFound(id) if id == NoteId::new(1)));

    let err = run_show(&h.context, NoteId::new(9), &mut Vec::new())
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "Note 9 not found");
}

#[tokio::test]
async fn analyze_prints_sentiment() {
    let h = harness(true).await;
    run_add(&h.context, "Holiday", "I love this beach", &mut Vec::new())
        .await
        .unwrap();

    let mut out = Vec::new();
    run_analyze(&h.context, NoteId::new(1), &mut out)
        .await
        .unwrap();

    assert_eq!(output(out), "1: positive\n");
    assert_eq!(
        h.context.store.get(NoteId::new(1)).unwrap().sentiment,
        Some(Sentiment::Positive)
    );
}

#[tokio::test]
async fn commands_without_session_stop_before_the_network() {
    let h = harness(false).await;

    let err = run_list(&h.context, None, false, &mut Vec::new())
        .await
        .unwrap_err();

    assert!(err.is_session_stop());
    assert_eq!(h.backend.lock().unwrap().requests, 0);
}

#[tokio::test]
async fn auth_status_and_logout() {
    let h = harness(true).await;

    let mut out = Vec::new();
    run_auth(AuthCommands::Status, &h.context, &mut out)
        .await
        .unwrap();
    assert!(output(out).starts_with("Signed in (session expires at "));

    let mut out = Vec::new();
    run_auth(AuthCommands::Logout, &h.context, &mut out)
        .await
        .unwrap();
    assert_eq!(output(out), "Signed out\n");
    assert!(!h.token_path.exists());

    let mut out = Vec::new();
    run_auth(AuthCommands::Status, &h.context, &mut out)
        .await
        .unwrap();
    assert_eq!(output(out), "Not signed in.\n");
}

#[tokio::test]
async fn auth_status_reports_expired_session() {
    let h = harness(false).await;
    FileTokenStore::new(&h.token_path)
        .save_token(&token_expiring_at(unix_timestamp_now() - 60))
        .unwrap();

    let mut out = Vec::new();
    run_auth(AuthCommands::Status, &h.context, &mut out)
        .await
        .unwrap();

    assert!(output(out).starts_with("Session expired."));
}
