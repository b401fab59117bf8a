//! Generation request types.

use derive_builder::Builder;
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use taleweaver_error::BuilderError;

/// Where the prior text of a continuation comes from.
///
/// When `filename` is set the new text is appended to that stored story,
/// and its content is used as the prior text unless `previous_story` is given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Continuation {
    /// Stored story to extend
    pub filename: Option<String>,
    /// Prior story text supplied by the client
    pub previous_story: Option<String>,
}

/// One prompt → story generation call.
///
/// # Examples
///
/// ```
/// use taleweaver_core::GenerationRequest;
///
/// let request = GenerationRequest::builder()
///     .prompt("A robot learns to paint")
///     .model("demo-model")
///     .max_tokens(100u32)
///     .build()
///     .unwrap();
///
/// assert_eq!(request.model().as_deref(), Some("demo-model"));
/// assert!(request.continuation().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder, Getters)]
#[builder(setter(into, strip_option))]
pub struct GenerationRequest {
    /// Story prompt, or the direction for a continuation
    prompt: String,

    /// Model to use (None = configured default)
    #[builder(default)]
    model: Option<String>,

    /// Requested unit limit (None = configured default)
    #[builder(default)]
    max_tokens: Option<u32>,

    /// Continuation source, if this extends an existing story
    #[builder(default)]
    continuation: Option<Continuation>,
}

impl GenerationRequest {
    /// Creates a new request builder.
    pub fn builder() -> GenerationRequestBuilder {
        GenerationRequestBuilder::default()
    }

    /// Whether this request continues an existing story.
    pub fn is_continuation(&self) -> bool {
        self.continuation.is_some()
    }
}

impl From<GenerationRequestBuilderError> for BuilderError {
    #[track_caller]
    fn from(err: GenerationRequestBuilderError) -> Self {
        match err {
            GenerationRequestBuilderError::UninitializedField(field) => {
                BuilderError::uninitialized("GenerationRequest", field)
            }
            GenerationRequestBuilderError::ValidationError(reason) => {
                BuilderError::invalid("GenerationRequest", reason)
            }
        }
    }
}
