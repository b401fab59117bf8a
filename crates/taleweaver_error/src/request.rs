//! Generation request validation errors.

/// Reasons a generation request is rejected before any work starts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum RequestErrorKind {
    /// Prompt is empty or whitespace
    #[display("Please provide a story prompt")]
    EmptyPrompt,

    /// Token ceiling must be at least one unit
    #[display("Token limit must be at least 1")]
    ZeroTokenLimit,
}

/// Request error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Request Error: {} at line {} in {}", kind, line, file)]
pub struct RequestError {
    /// The kind of error that occurred
    pub kind: RequestErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl RequestError {
    /// Create a new request error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: RequestErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &RequestErrorKind {
        &self.kind
    }
}
