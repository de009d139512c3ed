use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use xnote_core::analysis::AnalysisOrchestrator;
use xnote_core::api::GatewayClient;
use xnote_core::auth::{FileTokenStore, SessionGuard};
use xnote_core::config::ClientConfig;
use xnote_core::dialog::NoteDialog;
use xnote_core::store::NoteStore;
use xnote_core::{Error, Note, NoteId, Sentiment};

use crate::error::CliError;
use crate::session::TerminalNavigator;

const PREVIEW_CHARS: usize = 60;

/// Everything a command needs to talk to the gateway.
pub struct Context {
    pub session: SessionGuard,
    pub api: Arc<GatewayClient>,
    pub store: Arc<NoteStore<GatewayClient>>,
}

impl Context {
    pub fn new(config: &ClientConfig, token_path: PathBuf) -> Result<Self, CliError> {
        tracing::debug!(
            gateway = %config.gateway_url,
            token_path = %token_path.display(),
            "Building CLI context"
        );
        let session = SessionGuard::new(FileTokenStore::new(token_path), TerminalNavigator);
        let api = Arc::new(GatewayClient::new(config, session.clone())?);
        let store = Arc::new(NoteStore::new(api.clone(), session.clone()));
        Ok(Self {
            session,
            api,
            store,
        })
    }

    pub fn dialog(&self) -> NoteDialog<GatewayClient> {
        NoteDialog::new(self.store.clone())
    }

    pub fn analysis(&self) -> AnalysisOrchestrator<GatewayClient> {
        AnalysisOrchestrator::new(self.store.clone())
    }

    /// Load the collection and focus `dialog` on one note.
    pub async fn open_note(
        &self,
        dialog: &NoteDialog<GatewayClient>,
        id: NoteId,
    ) -> Result<Note, CliError> {
        self.store.list().await?;
        dialog.open_for_view(id).map_err(|error| not_loaded_to_missing(error, id))?;
        dialog.focused_note().ok_or(CliError::NoteNotFound(id))
    }
}

pub fn not_loaded_to_missing(error: Error, id: NoteId) -> CliError {
    match error {
        Error::NotLoaded(_) => CliError::NoteNotFound(id),
        other => CliError::Core(other),
    }
}

#[derive(Debug, Serialize)]
pub struct NoteListItem {
    pub id: i64,
    pub title: String,
    pub preview: String,
    pub content: String,
    pub sentiment: Option<Sentiment>,
    pub created_at: String,
    pub updated_at: String,
}

pub fn note_to_list_item(note: &Note) -> NoteListItem {
    NoteListItem {
        id: note.id.get(),
        title: note.title.clone(),
        preview: note.content_preview(PREVIEW_CHARS),
        content: note.content.clone(),
        sentiment: note.sentiment,
        created_at: note.created_at.clone(),
        updated_at: note.updated_at.clone(),
    }
}

pub fn sentiment_label(sentiment: Option<Sentiment>) -> &'static str {
    sentiment.map_or("not analyzed", Sentiment::as_str)
}

pub fn format_note_lines(notes: &[Note]) -> Vec<String> {
    notes
        .iter()
        .map(|note| {
            format!(
                "{:>5}  {}  [{}]  {}  {}",
                note.id,
                note.title,
                sentiment_label(note.sentiment),
                note.updated_label(),
                note.content_preview(PREVIEW_CHARS).replace('\n', " "),
            )
        })
        .collect()
}

pub fn format_note_detail(note: &Note) -> String {
    format!(
        "#{id} {title}\nSentiment: {sentiment}\nCreated: {created}\nUpdated: {updated}\n\n{content}",
        id = note.id,
        title = note.title,
        sentiment = sentiment_label(note.sentiment),
        created = note.created_label(),
        updated = note.updated_label(),
        content = note.content,
    )
}
