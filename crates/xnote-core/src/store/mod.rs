//! Client-side note collection.
//!
//! [`NoteStore`] is the single writer of the cached notes. Mutations are
//! applied only after the gateway confirms them, so a failed call never needs
//! a rollback. Subscribers are notified through a `watch` channel, and only
//! when the collection actually changes.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::watch;

use crate::api::NotesApi;
use crate::auth::SessionGuard;
use crate::error::{Error, Result};
use crate::models::{Note, NoteDraft, NoteId, Sentiment};

/// Filter notes by a case-insensitive substring of title or content.
///
/// An empty query returns every note, in order. Whitespace in the query is
/// matched literally.
#[must_use]
pub fn filter_notes(notes: &[Note], query: &str) -> Vec<Note> {
    if query.is_empty() {
        return notes.to_vec();
    }
    let needle = query.to_lowercase();

    notes
        .iter()
        .filter(|note| note.matches_lowercase(&needle))
        .cloned()
        .collect()
}

/// Keep the first note seen for every id, preserving order.
fn dedupe_by_id(notes: Vec<Note>) -> Vec<Note> {
    let mut seen = HashSet::with_capacity(notes.len());
    let total = notes.len();
    let unique: Vec<Note> = notes
        .into_iter()
        .filter(|note| seen.insert(note.id))
        .collect();
    if unique.len() != total {
        tracing::warn!(
            dropped = total - unique.len(),
            "Server returned duplicate note ids"
        );
    }
    unique
}

pub struct NoteStore<A> {
    api: Arc<A>,
    session: SessionGuard,
    notes: watch::Sender<Vec<Note>>,
}

impl<A> std::fmt::Debug for NoteStore<A> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("NoteStore")
            .field("notes", &self.notes.borrow().len())
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl<A: NotesApi> NoteStore<A> {
    pub fn new(api: Arc<A>, session: SessionGuard) -> Self {
        let (notes, _) = watch::channel(Vec::new());
        Self {
            api,
            session,
            notes,
        }
    }

    /// Receiver that observes every change to the collection.
    pub fn subscribe(&self) -> watch::Receiver<Vec<Note>> {
        self.notes.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<Note> {
        self.notes.borrow().clone()
    }

    #[must_use]
    pub fn get(&self, id: NoteId) -> Option<Note> {
        self.notes
            .borrow()
            .iter()
            .find(|note| note.id == id)
            .cloned()
    }

    #[must_use]
    pub fn contains(&self, id: NoteId) -> bool {
        self.notes.borrow().iter().any(|note| note.id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.notes.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notes.borrow().is_empty()
    }

    /// Load every note from the server, replacing the cached collection.
    pub async fn list(&self) -> Result<Vec<Note>> {
        self.session.ensure_authenticated()?;

        let notes = dedupe_by_id(self.api.list_notes().await?);
        tracing::debug!(count = notes.len(), "Loaded notes");

        self.notes.send_if_modified(|current| {
            if *current == notes {
                false
            } else {
                current.clone_from(&notes);
                true
            }
        });
        Ok(notes)
    }

    /// Load one note and refresh the cached copy if there is one.
    pub async fn fetch(&self, id: NoteId) -> Result<Note> {
        self.session.ensure_authenticated()?;

        let note = self.api.get_note(id).await?;
        self.replace_cached(&note);
        Ok(note)
    }

    pub async fn create(&self, draft: &NoteDraft) -> Result<Note> {
        draft.validate().map_err(Error::Validation)?;
        self.session.ensure_authenticated()?;

        let note = self.api.create_note(draft).await?;
        tracing::info!(note_id = %note.id, "Created note");

        self.notes.send_modify(|current| {
            current.retain(|existing| existing.id != note.id);
            current.insert(0, note.clone());
        });
        Ok(note)
    }

    /// Save `draft` over an existing note.
    ///
    /// The server copy replaces the cached one in place. If the note left
    /// the cache while the request was in flight the response is dropped.
    pub async fn update(&self, id: NoteId, draft: &NoteDraft) -> Result<Note> {
        draft.validate().map_err(Error::Validation)?;
        self.session.ensure_authenticated()?;

        let note = self.api.update_note(id, draft).await?;
        tracing::info!(note_id = %id, "Updated note");

        if !self.replace_cached(&note) {
            tracing::debug!(note_id = %id, "Discarding update for a note no longer cached");
        }
        Ok(note)
    }

    pub async fn delete(&self, id: NoteId) -> Result<()> {
        self.session.ensure_authenticated()?;

        self.api.delete_note(id).await?;
        tracing::info!(note_id = %id, "Deleted note");

        self.notes.send_if_modified(|current| {
            let before = current.len();
            current.retain(|note| note.id != id);
            current.len() != before
        });
        Ok(())
    }

    /// Cached notes matching `query`. Never touches the network.
    #[must_use]
    pub fn filter(&self, query: &str) -> Vec<Note> {
        filter_notes(&self.notes.borrow(), query)
    }

    pub(crate) fn api(&self) -> &A {
        &self.api
    }

    pub(crate) const fn session(&self) -> &SessionGuard {
        &self.session
    }

    /// Set the sentiment of a cached note, leaving every other field alone.
    ///
    /// Returns `false` when the note is not cached.
    pub(crate) fn merge_sentiment(&self, id: NoteId, sentiment: Sentiment) -> bool {
        let mut found = false;
        self.notes.send_if_modified(|current| {
            let Some(note) = current.iter_mut().find(|note| note.id == id) else {
                return false;
            };
            found = true;
            if note.sentiment == Some(sentiment) {
                return false;
            }
            note.sentiment = Some(sentiment);
            true
        });
        found
    }

    /// Swap in the server copy of a cached note, keeping its position.
    fn replace_cached(&self, note: &Note) -> bool {
        let mut found = false;
        self.notes.send_if_modified(|current| {
            let Some(slot) = current.iter_mut().find(|existing| existing.id == note.id) else {
                return false;
            };
            found = true;
            if slot == note {
                return false;
            }
            slot.clone_from(note);
            true
        });
        found
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::api::testing::{FakeApi, FakeFailure};
    use crate::auth::testing::{signed_in_session, RecordingNavigator};
    use crate::auth::MemoryTokenStore;
    use crate::error::NetworkFailure;

    fn titles(notes: &[Note]) -> Vec<&str> {
        notes.iter().map(|note| note.title.as_str()).collect()
    }

    fn store_with(notes: &[(&str, &str)]) -> (NoteStore<FakeApi>, Arc<FakeApi>) {
        let api = Arc::new(FakeApi::with_notes(notes));
        let (session, _, _) = signed_in_session();
        (NoteStore::new(api.clone(), session), api)
    }

    fn note(id: i64, title: &str, content: &str) -> Note {
        Note {
            id: NoteId::new(id),
            title: title.to_string(),
            content: content.to_string(),
            sentiment: None,
            created_at: "2024-01-01T00:00:00".to_string(),
            updated_at: "2024-01-01T00:00:00".to_string(),
        }
    }

    #[test]
    fn filter_notes_matches_title_or_content() {
        let notes = vec![
            note(1, "Grocery list", "Milk, eggs, and bread"),
            note(2, "Meeting notes", "Discuss the roadmap"),
        ];

        assert_eq!(titles(&filter_notes(&notes, "meet")), vec!["Meeting notes"]);
        assert_eq!(titles(&filter_notes(&notes, "EGGS")), vec!["Grocery list"]);
        assert_eq!(
            titles(&filter_notes(&notes, "")),
            vec!["Grocery list", "Meeting notes"]
        );
        assert!(filter_notes(&notes, "zebra").is_empty());
    }

    #[test]
    fn filter_notes_matches_whitespace_literally() {
        let notes = vec![
            note(1, "Grocery list", "Milk, eggs, and bread"),
            note(2, "Meeting notes", "Discuss the roadmap"),
        ];

        assert!(filter_notes(&notes, "list ").is_empty());
        assert!(filter_notes(&notes, "   ").is_empty());
        assert_eq!(titles(&filter_notes(&notes, "eggs, ")), vec!["Grocery list"]);
        assert_eq!(titles(&filter_notes(&notes, "the road")), vec!["Meeting notes"]);
    }

    #[test]
    fn dedupe_keeps_first_occurrence() {
        let notes = dedupe_by_id(vec![
            note(1, "first", "0123456789"),
            note(2, "second", "0123456789"),
            note(1, "again", "0123456789"),
        ]);
        assert_eq!(titles(&notes), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn list_replaces_collection_in_backend_order() {
        let (store, _) = store_with(&[
            ("Grocery list", "Milk, eggs, and bread"),
            ("Meeting notes", "Discuss the roadmap"),
        ]);

        let loaded = store.list().await.unwrap();

        assert_eq!(titles(&loaded), vec!["Grocery list", "Meeting notes"]);
        assert_eq!(store.snapshot(), loaded);
        assert_eq!(titles(&store.filter("meet")), vec!["Meeting notes"]);
    }

    #[tokio::test]
    async fn list_failure_leaves_collection_untouched() {
        let (store, api) = store_with(&[("Grocery list", "Milk, eggs, and bread")]);
        store.list().await.unwrap();
        let before = store.snapshot();

        api.fail_next(FakeFailure::Network(NetworkFailure::Unreachable));
        let err = store.list().await.unwrap_err();

        assert!(matches!(err, Error::Network(NetworkFailure::Unreachable)));
        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn unauthenticated_operations_redirect_without_network() {
        let api = Arc::new(FakeApi::with_notes(&[("Grocery list", "Milk, eggs")]));
        let navigator = RecordingNavigator::default();
        let session = SessionGuard::new(MemoryTokenStore::default(), navigator.clone());
        let store = NoteStore::new(api.clone(), session);

        assert!(matches!(store.list().await, Err(Error::Unauthorized)));
        assert!(matches!(
            store.delete(NoteId::new(1)).await,
            Err(Error::Unauthorized)
        ));
        assert_eq!(navigator.redirects(), 2);
        assert_eq!(api.calls(), 0);
    }

    #[tokio::test]
    async fn create_then_list_includes_exactly_one_new_note() {
        let (store, _) = store_with(&[("Grocery list", "Milk, eggs, and bread")]);
        let before = store.list().await.unwrap();

        let created = store
            .create(&NoteDraft::new("Trip plan", "Pack the tent and stove"))
            .await
            .unwrap();

        assert!(before.iter().all(|note| note.id != created.id));
        assert_eq!(store.snapshot()[0], created);

        let after = store.list().await.unwrap();
        assert_eq!(after.len(), before.len() + 1);
        assert_eq!(
            after.iter().filter(|note| note.id == created.id).count(),
            1
        );
    }

    #[tokio::test]
    async fn invalid_draft_is_rejected_without_network_call() {
        let (store, api) = store_with(&[("Grocery list", "Milk, eggs, and bread")]);
        store.list().await.unwrap();
        let before = store.snapshot();
        let calls = api.calls();

        let err = store
            .create(&NoteDraft::new("Hi", "short"))
            .await
            .unwrap_err();

        let Error::Validation(errors) = err else {
            panic!("expected validation error, got {err:?}");
        };
        assert_eq!(
            errors.content.as_deref(),
            Some("Content must be at least 10 characters long")
        );
        assert_eq!(errors.title, None);
        assert_eq!(api.calls(), calls);
        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn create_failure_surfaces_server_detail() {
        let (store, api) = store_with(&[]);
        api.fail_next(FakeFailure::Server(422, "Title too long".to_string()));

        let err = store
            .create(&NoteDraft::new("Trip plan", "Pack the tent and stove"))
            .await
            .unwrap_err();

        assert_eq!(err.user_message(), "Title too long");
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn update_then_fetch_returns_new_fields_with_stable_identity() {
        let (store, _) = store_with(&[
            ("Grocery list", "Milk, eggs, and bread"),
            ("Meeting notes", "Discuss the roadmap"),
        ]);
        let loaded = store.list().await.unwrap();
        let original = loaded[1].clone();

        store
            .update(original.id, &NoteDraft::new("Standup", "Discuss blockers today"))
            .await
            .unwrap();

        let fetched = store.fetch(original.id).await.unwrap();
        assert_eq!(fetched.id, original.id);
        assert_eq!(fetched.created_at, original.created_at);
        assert_eq!(fetched.title, "Standup");
        assert_eq!(fetched.content, "Discuss blockers today");
        assert_eq!(titles(&store.snapshot()), vec!["Grocery list", "Standup"]);
    }

    #[tokio::test]
    async fn update_for_note_no_longer_cached_is_discarded() {
        let (store, api) = store_with(&[("Grocery list", "Milk, eggs, and bread")]);
        store.list().await.unwrap();
        let hidden = api.insert_direct("Late", "Arrived after the list call");
        let before = store.snapshot();

        let updated = store
            .update(hidden.id, &NoteDraft::new("Late edit", "Edited elsewhere already"))
            .await
            .unwrap();

        assert_eq!(updated.title, "Late edit");
        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn update_failure_leaves_note_unchanged() {
        let (store, api) = store_with(&[("Grocery list", "Milk, eggs, and bread")]);
        let loaded = store.list().await.unwrap();
        api.fail_next(FakeFailure::Network(NetworkFailure::Timeout));

        let err = store
            .update(loaded[0].id, &NoteDraft::new("Groceries", "Milk and more milk"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Network(NetworkFailure::Timeout)));
        assert_eq!(store.snapshot(), loaded);
    }

    #[tokio::test]
    async fn delete_then_list_omits_id_and_second_delete_is_not_found() {
        let (store, _) = store_with(&[
            ("Grocery list", "Milk, eggs, and bread"),
            ("Meeting notes", "Discuss the roadmap"),
        ]);
        let loaded = store.list().await.unwrap();
        let target = loaded[0].id;

        store.delete(target).await.unwrap();
        assert!(!store.contains(target));

        let after = store.list().await.unwrap();
        assert!(after.iter().all(|note| note.id != target));

        let err = store.delete(target).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn subscribers_see_only_real_changes() {
        let (store, _) = store_with(&[("Grocery list", "Milk, eggs, and bread")]);
        let mut updates = store.subscribe();

        store.list().await.unwrap();
        assert!(updates.has_changed().unwrap());
        updates.borrow_and_update();

        store.list().await.unwrap();
        assert!(!updates.has_changed().unwrap());
    }
}
