//! Sentiment analysis for cached notes.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use crate::api::NotesApi;
use crate::error::{Error, Result};
use crate::models::{NoteId, Sentiment};
use crate::store::NoteStore;

/// Requests sentiment classification and merges the label into the store.
///
/// At most one analysis per note is outstanding at a time.
pub struct AnalysisOrchestrator<A> {
    store: Arc<NoteStore<A>>,
    in_flight: Arc<Mutex<HashSet<NoteId>>>,
}

impl<A> Clone for AnalysisOrchestrator<A> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl<A> std::fmt::Debug for AnalysisOrchestrator<A> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let in_flight = self
            .in_flight
            .lock()
            .map_or(0, |in_flight| in_flight.len());
        formatter
            .debug_struct("AnalysisOrchestrator")
            .field("in_flight", &in_flight)
            .finish_non_exhaustive()
    }
}

/// Clears the in-flight mark when dropped, whatever the outcome.
struct InFlightGuard {
    id: NoteId,
    in_flight: Arc<Mutex<HashSet<NoteId>>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

impl<A: NotesApi> AnalysisOrchestrator<A> {
    pub fn new(store: Arc<NoteStore<A>>) -> Self {
        Self {
            store,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    #[must_use]
    pub fn is_analyzing(&self, id: NoteId) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&id)
    }

    /// Classify a loaded note and merge only its sentiment into the store.
    pub async fn analyze(&self, id: NoteId) -> Result<Sentiment> {
        self.store.session().ensure_authenticated()?;
        if !self.store.contains(id) {
            return Err(Error::NotLoaded(id));
        }

        let _guard = self.mark_in_flight(id)?;
        tracing::debug!(note_id = %id, "Requesting sentiment analysis");

        match self.store.api().analyze_note(id).await {
            Ok(sentiment) => {
                if !self.store.merge_sentiment(id, sentiment) {
                    tracing::debug!(note_id = %id, "Note left the store before analysis finished");
                }
                tracing::info!(note_id = %id, sentiment = %sentiment, "Analysis complete");
                Ok(sentiment)
            }
            Err(error) => {
                if error.is_not_found() {
                    tracing::warn!(note_id = %id, "Note no longer exists on the server");
                } else {
                    tracing::warn!(note_id = %id, %error, "Analysis failed");
                }
                Err(error)
            }
        }
    }

    fn mark_in_flight(&self, id: NoteId) -> Result<InFlightGuard> {
        let inserted = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id);
        if !inserted {
            return Err(Error::AnalysisInProgress(id));
        }
        Ok(InFlightGuard {
            id,
            in_flight: Arc::clone(&self.in_flight),
        })
    }
}
