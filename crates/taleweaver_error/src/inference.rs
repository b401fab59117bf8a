//! Inference service errors.

/// Failure conditions reported by the inference client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum InferenceErrorKind {
    /// The inference service could not be reached
    #[display("Inference service unavailable at {}", _0)]
    ServiceUnavailable(String),

    /// The requested model is not installed on the inference service
    #[display("Model not found: {}", _0)]
    ModelNotFound(String),

    /// The service answered with something that is not a valid generation stream
    #[display("Protocol error: {}", _0)]
    Protocol(String),

    /// The service reported an error of its own
    #[display("API error: {}", _0)]
    Api(String),
}

/// Inference error with location tracking.
///
/// # Examples
///
/// ```
/// use taleweaver_error::{InferenceError, InferenceErrorKind};
///
/// let err = InferenceError::new(InferenceErrorKind::ModelNotFound("llama2".to_string()));
/// assert!(format!("{}", err).contains("Model not found: llama2"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Inference Error: {} at {}:{}", kind, file, line)]
pub struct InferenceError {
    /// The specific error kind
    pub kind: InferenceErrorKind,
    /// Line number where error occurred
    pub line: u32,
    /// Source file where error occurred
    pub file: &'static str,
}

impl InferenceError {
    /// Create a new inference error.
    #[track_caller]
    pub fn new(kind: InferenceErrorKind) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            line: loc.line(),
            file: loc.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &InferenceErrorKind {
        &self.kind
    }
}

/// Result type for inference operations.
pub type InferenceResult<T> = Result<T, InferenceError>;
