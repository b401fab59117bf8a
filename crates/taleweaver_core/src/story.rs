//! Story metadata and listing types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a story file came into being.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumIter,
    derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum StoryKind {
    /// Generated from a fresh prompt
    #[default]
    #[display("story")]
    Original,
    /// Continuation of text that was never stored
    #[display("story_continuation")]
    Continuation,
}

impl StoryKind {
    /// Filename prefix for stories of this kind.
    pub fn file_prefix(&self) -> &'static str {
        match self {
            StoryKind::Original => "story",
            StoryKind::Continuation => "story_continuation",
        }
    }
}

/// One continuation applied to a stored story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinuationRecord {
    /// Direction the user gave for the continuation
    pub direction: String,
    /// Model that generated the continuation
    pub model: String,
    /// When the continuation was appended
    pub continued_at: DateTime<Utc>,
}

/// Metadata persisted alongside a story's text.
///
/// # Examples
///
/// ```
/// use taleweaver_core::{StoryKind, StoryMetadata};
///
/// let metadata = StoryMetadata::new("llama2", "A robot learns to paint");
/// assert_eq!(metadata.kind, StoryKind::Original);
/// assert!(metadata.continuations.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryMetadata {
    /// Model that generated the story
    pub model: String,
    /// Prompt the story was generated from
    pub prompt: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Origin of the file
    #[serde(default)]
    pub kind: StoryKind,
    /// Continuations appended since creation, oldest first
    #[serde(default)]
    pub continuations: Vec<ContinuationRecord>,
}

impl StoryMetadata {
    /// Metadata for a story created now.
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            created_at: Utc::now(),
            kind: StoryKind::Original,
            continuations: Vec::new(),
        }
    }

    /// Set the story kind.
    pub fn with_kind(mut self, kind: StoryKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Directory listing entry for a stored story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorySummary {
    /// Story filename
    pub name: String,
    /// File size in bytes
    pub size: u64,
    /// Last modification time
    pub modified: DateTime<Utc>,
}
