//! xnote-core - Core library for Xnote
//!
//! This crate contains the session-gated data layer shared by every Xnote
//! front-end: note models, the session guard, the gateway transport, the
//! client-side note store, sentiment analysis orchestration, and the note
//! dialog state machine.

pub mod analysis;
pub mod api;
pub mod auth;
pub mod config;
pub mod dialog;
pub mod error;
pub mod models;
pub mod store;
pub mod util;

pub use error::{Error, NetworkFailure, Result, ValidationErrors};
pub use models::{Note, NoteDraft, NoteId, Sentiment};
