//! Create/view/edit/delete lifecycle for a single note.
//!
//! The dialog only remembers which note it is focused on; the note itself is
//! always read from the [`NoteStore`]. Drafts are scratch copies and reach the
//! store only through a confirmed [`NoteDialog::submit`].

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use crate::api::NotesApi;
use crate::error::{Error, Result, ValidationErrors};
use crate::models::{Note, NoteDraft, NoteId};
use crate::store::NoteStore;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DialogState {
    #[default]
    Closed,
    Creating {
        draft: NoteDraft,
        error: Option<String>,
        field_errors: ValidationErrors,
    },
    Viewing {
        note_id: NoteId,
        error: Option<String>,
    },
    Editing {
        note_id: NoteId,
        draft: NoteDraft,
        error: Option<String>,
        field_errors: ValidationErrors,
    },
}

impl DialogState {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Creating { .. } => "creating",
            Self::Viewing { .. } => "viewing",
            Self::Editing { .. } => "editing",
        }
    }

    /// Note the dialog is focused on, if any.
    #[must_use]
    pub const fn focus(&self) -> Option<NoteId> {
        match self {
            Self::Viewing { note_id, .. } | Self::Editing { note_id, .. } => Some(*note_id),
            Self::Closed | Self::Creating { .. } => None,
        }
    }

    #[must_use]
    pub const fn draft(&self) -> Option<&NoteDraft> {
        match self {
            Self::Creating { draft, .. } | Self::Editing { draft, .. } => Some(draft),
            Self::Closed | Self::Viewing { .. } => None,
        }
    }

    /// Inline error from the last failed submit or delete.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Creating { error, .. }
            | Self::Viewing { error, .. }
            | Self::Editing { error, .. } => error.as_deref(),
            Self::Closed => None,
        }
    }

    #[must_use]
    pub const fn field_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Creating { field_errors, .. } | Self::Editing { field_errors, .. } => {
                Some(field_errors)
            }
            Self::Closed | Self::Viewing { .. } => None,
        }
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        !matches!(self, Self::Closed)
    }

    fn set_error(&mut self, message: Option<String>) {
        match self {
            Self::Creating { error, .. }
            | Self::Viewing { error, .. }
            | Self::Editing { error, .. } => *error = message,
            Self::Closed => {}
        }
    }

    fn set_field_errors(&mut self, errors: ValidationErrors) {
        match self {
            Self::Creating { field_errors, .. } | Self::Editing { field_errors, .. } => {
                *field_errors = errors;
            }
            Self::Closed | Self::Viewing { .. } => {}
        }
    }
}

/// Outcome reported to the caller after a confirmed change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogEvent {
    Created(Note),
    Updated(Note),
    Deleted(NoteId),
}

/// What a submit is about to send.
enum Submission {
    Create(NoteDraft),
    Update(NoteId, NoteDraft),
}

pub struct NoteDialog<A> {
    store: Arc<NoteStore<A>>,
    state: watch::Sender<DialogState>,
    generation: AtomicU64,
    submitting: AtomicBool,
}

/// Clears the submitting flag when dropped.
struct SubmitGuard<'a>(&'a AtomicBool);

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl<A> std::fmt::Debug for NoteDialog<A> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("NoteDialog")
            .field("state", &*self.state.borrow())
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .field("submitting", &self.submitting.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl<A: NotesApi> NoteDialog<A> {
    pub fn new(store: Arc<NoteStore<A>>) -> Self {
        let (state, _) = watch::channel(DialogState::Closed);
        Self {
            store,
            state,
            generation: AtomicU64::new(0),
            submitting: AtomicBool::new(false),
        }
    }

    /// Whether a submit or delete is waiting on the gateway.
    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::SeqCst)
    }

    fn begin_submit(&self) -> Result<SubmitGuard<'_>> {
        self.submitting
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| Error::SubmitInProgress)?;
        Ok(SubmitGuard(&self.submitting))
    }

    #[must_use]
    pub fn state(&self) -> DialogState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DialogState> {
        self.state.subscribe()
    }

    /// Store copy of the focused note.
    #[must_use]
    pub fn focused_note(&self) -> Option<Note> {
        self.state.borrow().focus().and_then(|id| self.store.get(id))
    }

    pub fn open_for_create(&self) -> Result<()> {
        let current = self.state();
        if !matches!(current, DialogState::Closed) {
            return Err(invalid(&current, "create"));
        }
        self.replace(DialogState::Creating {
            draft: NoteDraft::default(),
            error: None,
            field_errors: ValidationErrors::default(),
        });
        Ok(())
    }

    pub fn open_for_view(&self, id: NoteId) -> Result<()> {
        let current = self.state();
        if !matches!(current, DialogState::Closed | DialogState::Viewing { .. }) {
            return Err(invalid(&current, "view"));
        }
        if !self.store.contains(id) {
            return Err(Error::NotLoaded(id));
        }
        self.replace(DialogState::Viewing {
            note_id: id,
            error: None,
        });
        Ok(())
    }

    /// Switch from viewing to editing, seeding the draft from the store.
    pub fn begin_edit(&self) -> Result<()> {
        let current = self.state();
        let DialogState::Viewing { note_id, .. } = current else {
            return Err(invalid(&current, "edit"));
        };
        let note = self.store.get(note_id).ok_or(Error::NotLoaded(note_id))?;
        self.replace(DialogState::Editing {
            note_id,
            draft: NoteDraft::from_note(&note),
            error: None,
            field_errors: ValidationErrors::default(),
        });
        Ok(())
    }

    pub fn update_draft(&self, edit: impl FnOnce(&mut NoteDraft)) -> Result<()> {
        let mut rejected_in = None;
        self.state.send_if_modified(|state| {
            let name = state.name();
            match state {
                DialogState::Creating { draft, .. } | DialogState::Editing { draft, .. } => {
                    edit(draft);
                    true
                }
                DialogState::Closed | DialogState::Viewing { .. } => {
                    rejected_in = Some(name);
                    false
                }
            }
        });
        match rejected_in {
            Some(state) => Err(Error::InvalidTransition {
                state,
                action: "edit the draft",
            }),
            None => Ok(()),
        }
    }

    /// Validate and send the draft.
    ///
    /// Creating closes the dialog on success; editing returns to viewing.
    pub async fn submit(&self) -> Result<DialogEvent> {
        let _submitting = self.begin_submit()?;
        let (generation, submission) = {
            let state = self.state.borrow();
            let submission = match &*state {
                DialogState::Creating { draft, .. } => Submission::Create(draft.clone()),
                DialogState::Editing { note_id, draft, .. } => {
                    Submission::Update(*note_id, draft.clone())
                }
                other => return Err(invalid(other, "submit")),
            };
            (self.generation.load(Ordering::SeqCst), submission)
        };

        let draft = match &submission {
            Submission::Create(draft) | Submission::Update(_, draft) => draft,
        };
        if let Err(errors) = draft.validate() {
            self.annotate(generation, |state| state.set_field_errors(errors.clone()));
            return Err(Error::Validation(errors));
        }
        self.annotate(generation, |state| {
            state.set_field_errors(ValidationErrors::default());
            state.set_error(None);
        });

        let outcome = match &submission {
            Submission::Create(draft) => self.store.create(draft).await.map(DialogEvent::Created),
            Submission::Update(id, draft) => {
                self.store.update(*id, draft).await.map(DialogEvent::Updated)
            }
        };

        match outcome {
            Ok(event) => {
                let next = match &event {
                    DialogEvent::Updated(note) => DialogState::Viewing {
                        note_id: note.id,
                        error: None,
                    },
                    DialogEvent::Created(_) | DialogEvent::Deleted(_) => DialogState::Closed,
                };
                if !self.replace_if_current(generation, next) {
                    tracing::debug!("Dialog moved on while submit was in flight");
                }
                Ok(event)
            }
            Err(error) => Err(self.fail(generation, error)),
        }
    }

    /// Delete the viewed note, closing the dialog on success.
    pub async fn delete(&self) -> Result<DialogEvent> {
        let _submitting = self.begin_submit()?;
        let (generation, note_id) = {
            let state = self.state.borrow();
            let DialogState::Viewing { note_id, .. } = &*state else {
                return Err(invalid(&state, "delete"));
            };
            (self.generation.load(Ordering::SeqCst), *note_id)
        };

        match self.store.delete(note_id).await {
            Ok(()) => {
                if !self.replace_if_current(generation, DialogState::Closed) {
                    tracing::debug!(
                        note_id = %note_id,
                        "Dialog moved on while delete was in flight"
                    );
                }
                Ok(DialogEvent::Deleted(note_id))
            }
            Err(error) => Err(self.fail(generation, error)),
        }
    }

    /// Back out of the current state. Editing returns to viewing and drops
    /// the draft; anything else closes.
    pub fn cancel(&self) {
        let next = match &*self.state.borrow() {
            DialogState::Closed => return,
            DialogState::Editing { note_id, .. } => DialogState::Viewing {
                note_id: *note_id,
                error: None,
            },
            DialogState::Creating { .. } | DialogState::Viewing { .. } => DialogState::Closed,
        };
        self.replace(next);
    }

    /// Record a failure. A 401 closes the dialog; the session guard has
    /// already redirected.
    fn fail(&self, generation: u64, error: Error) -> Error {
        if matches!(error, Error::Unauthorized) {
            self.replace_if_current(generation, DialogState::Closed);
        } else {
            let message = error.user_message();
            self.annotate(generation, |state| state.set_error(Some(message)));
        }
        error
    }

    fn replace(&self, next: DialogState) {
        self.state.send_modify(|state| {
            self.generation.fetch_add(1, Ordering::SeqCst);
            *state = next;
        });
    }

    fn replace_if_current(&self, generation: u64, next: DialogState) -> bool {
        self.state.send_if_modified(|state| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            self.generation.fetch_add(1, Ordering::SeqCst);
            *state = next;
            true
        })
    }

    /// Modify the state in place without starting a new generation.
    fn annotate(&self, generation: u64, modify: impl FnOnce(&mut DialogState)) {
        self.state.send_if_modified(|state| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            let before = state.clone();
            modify(state);
            *state != before
        });
    }
}

fn invalid(state: &DialogState, action: &'static str) -> Error {
    Error::InvalidTransition {
        state: state.name(),
        action,
    }
}
