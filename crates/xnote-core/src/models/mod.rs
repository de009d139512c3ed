//! Data models for Xnote

mod note;

pub use note::{
    format_timestamp_label, Note, NoteAnalysis, NoteDraft, NoteId, Sentiment, MIN_CONTENT_CHARS,
};
