use std::io;

use thiserror::Error;
use xnote_core::NoteId;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] xnote_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Login failed. Check your username and password.")]
    LoginFailed,
    #[error("Note {0} not found")]
    NoteNotFound(NoteId),
    #[error("Nothing to change: pass --title and/or --content")]
    NothingToEdit,
    #[error("Password cannot be empty")]
    EmptyPassword,
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CliError {
    /// Message shown to the user on failure.
    pub fn user_message(&self) -> String {
        match self {
            Self::Core(error) => error.user_message(),
            other => other.to_string(),
        }
    }

    /// The session guard already told the user to sign in again.
    pub const fn is_session_stop(&self) -> bool {
        matches!(self, Self::Core(xnote_core::Error::Unauthorized))
    }
}
