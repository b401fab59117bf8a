//! Traits at the inference and storage seams.

use async_trait::async_trait;
use futures_util::stream::Stream;
use std::path::PathBuf;
use std::pin::Pin;
use taleweaver_core::{CompletionRequest, ContinuationRecord, Fragment, StoryMetadata, StorySummary};
use taleweaver_error::{InferenceResult, StorageResult};

/// Stream of generated fragments.
///
/// Dropping the stream abandons the generation and closes the upstream
/// connection.
pub type FragmentStream = Pin<Box<dyn Stream<Item = InferenceResult<Fragment>> + Send>>;

/// A local text-generation service.
#[async_trait]
pub trait InferenceDriver: Send + Sync {
    /// Provider name (e.g., "ollama").
    fn provider_name(&self) -> &'static str;

    /// Names of the models the service reports as installed.
    async fn list_models(&self) -> InferenceResult<Vec<String>>;

    /// Generate a complete response in one call.
    async fn generate(&self, req: &CompletionRequest) -> InferenceResult<String>;

    /// Generate a streaming response.
    ///
    /// The stream ends after the fragment whose `done` flag is set, or with an
    /// error item.
    async fn generate_stream(&self, req: &CompletionRequest) -> InferenceResult<FragmentStream>;
}

/// Persistent storage for generated stories.
///
/// Filenames are opaque identifiers returned by [`StoryStore::save`]. Names
/// that do not identify a story inside the store resolve to `NotFound`.
#[async_trait]
pub trait StoryStore: Send + Sync {
    /// Store a new story and return its filename.
    async fn save(&self, content: &str, metadata: &StoryMetadata) -> StorageResult<String>;

    /// Stored stories, most recently modified first.
    async fn list(&self) -> StorageResult<Vec<StorySummary>>;

    /// Full text of a story.
    async fn load(&self, filename: &str) -> StorageResult<String>;

    /// Append text to an existing story and return the updated content.
    ///
    /// The addition is all-or-nothing.
    async fn append(&self, filename: &str, content: &str) -> StorageResult<String>;

    /// Metadata for a story, if any was recorded.
    async fn metadata(&self, filename: &str) -> StorageResult<Option<StoryMetadata>>;

    /// Add a continuation record to a story's metadata.
    async fn record_continuation(
        &self,
        filename: &str,
        record: ContinuationRecord,
    ) -> StorageResult<()>;

    /// On-disk location of a story.
    fn path_of(&self, filename: &str) -> StorageResult<PathBuf>;
}
