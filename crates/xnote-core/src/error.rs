//! Error types for xnote-core

use std::fmt;

use thiserror::Error;

use crate::models::NoteId;

/// Result type alias using xnote-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Why a request never produced a usable response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkFailure {
    /// The gateway could not be reached at all.
    Unreachable,
    /// The request exceeded its time bound.
    Timeout,
}

impl fmt::Display for NetworkFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreachable => f.write_str("server unreachable"),
            Self::Timeout => f.write_str("request timed out"),
        }
    }
}

/// Field-level validation messages for a note draft.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl ValidationErrors {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = [self.title.as_deref(), self.content.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        f.write_str(&messages.join("; "))
    }
}

/// Errors that can occur in xnote-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Local pre-submit field checks failed
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// The gateway reported the resource as missing
    #[error("Note not found: {0}")]
    NotFound(String),

    /// The session is missing, expired, or was rejected with 401
    #[error("Session is not authenticated")]
    Unauthorized,

    /// Transport-level failure
    #[error("Network error: {0}")]
    Network(NetworkFailure),

    /// Any other non-2xx or malformed response
    #[error("Server error ({status}): {detail}")]
    Server { status: u16, detail: String },

    /// The note is not present in the local collection
    #[error("Note {0} is not loaded")]
    NotLoaded(NoteId),

    /// An analysis for this note is still outstanding
    #[error("Analysis already in progress for note {0}")]
    AnalysisInProgress(NoteId),

    /// The dialog is still waiting on a submit or delete
    #[error("A save is already in progress")]
    SubmitInProgress,

    /// The dialog cannot perform `action` from its current state
    #[error("Cannot {action} while dialog is {state}")]
    InvalidTransition {
        state: &'static str,
        action: &'static str,
    },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid client configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Token persistence failure
    #[error("Token storage error: {0}")]
    Storage(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Human-readable text suitable for inline display.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(errors) => errors.to_string(),
            Self::NotFound(detail) => {
                if detail.trim().is_empty() {
                    "Note not found".to_string()
                } else {
                    detail.clone()
                }
            }
            Self::Unauthorized => "Your session has expired. Please log in again.".to_string(),
            Self::Network(NetworkFailure::Unreachable) => {
                "Cannot connect to the server. Please check that the gateway is running."
                    .to_string()
            }
            Self::Network(NetworkFailure::Timeout) => {
                "Request timed out. The server took too long to respond.".to_string()
            }
            Self::Server { status, detail } => {
                if detail.trim().is_empty() {
                    format!("Server error: {status}")
                } else {
                    detail.clone()
                }
            }
            other => other.to_string(),
        }
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
