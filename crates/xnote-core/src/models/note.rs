//! Note model

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{Error, ValidationErrors};
use crate::util::truncate_text;

/// Minimum content length accepted by the create and edit paths.
pub const MIN_CONTENT_CHARS: usize = 10;

/// Server-assigned note identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(i64);

impl NoteId {
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NoteId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

/// Sentiment label computed by the external classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sentiment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" => Ok(Self::Positive),
            "negative" => Ok(Self::Negative),
            "neutral" => Ok(Self::Neutral),
            other => Err(Error::InvalidInput(format!("unknown sentiment `{other}`"))),
        }
    }
}

/// A note as returned by the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub content: String,
    /// `None` until the note has been analyzed
    #[serde(default)]
    pub sentiment: Option<Sentiment>,
    /// Server timestamp, kept verbatim
    pub created_at: String,
    /// Server timestamp, kept verbatim; changes on every successful edit
    pub updated_at: String,
}

impl Note {
    /// Case-insensitive match against title or content.
    ///
    /// `needle` must already be lowercased.
    #[must_use]
    pub fn matches_lowercase(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle) || self.content.to_lowercase().contains(needle)
    }

    /// Content truncated to `max_chars`, with a trailing ellipsis when cut.
    #[must_use]
    pub fn content_preview(&self, max_chars: usize) -> String {
        truncate_text(&self.content, max_chars)
    }

    #[must_use]
    pub fn created_label(&self) -> String {
        format_timestamp_label(&self.created_at)
    }

    #[must_use]
    pub fn updated_label(&self) -> String {
        format_timestamp_label(&self.updated_at)
    }
}

/// Render a server timestamp as `Jan 5, 2024`.
///
/// Accepts RFC 3339, naive ISO 8601 date-times, and bare dates. Anything
/// else is returned unchanged.
#[must_use]
pub fn format_timestamp_label(raw: &str) -> String {
    const LABEL: &str = "%b %-d, %Y";
    let trimmed = raw.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return parsed.format(LABEL).to_string();
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        return parsed.format(LABEL).to_string();
    }
    if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return parsed.format(LABEL).to_string();
    }
    raw.to_string()
}

/// Unsaved title/content pair being composed or edited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
}

impl NoteDraft {
    #[must_use]
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }

    /// Seed a draft from the current state of a note.
    #[must_use]
    pub fn from_note(note: &Note) -> Self {
        Self::new(note.title.clone(), note.content.clone())
    }

    /// Run the local field checks.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();

        if self.title.trim().is_empty() {
            errors.title = Some("Title is required".to_string());
        }

        if self.content.is_empty() {
            errors.content = Some("Content is required".to_string());
        } else if self.content.chars().count() < MIN_CONTENT_CHARS {
            errors.content = Some(format!(
                "Content must be at least {MIN_CONTENT_CHARS} characters long"
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Body of a successful analysis response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteAnalysis {
    pub sentiment: Sentiment,
}
