//! Generation outcomes, reports and streamed events.

use serde::{Deserialize, Serialize};
use taleweaver_error::{InferenceErrorKind, StorageErrorKind, TaleweaverError, TaleweaverErrorKind};

/// Terminal state of a generation.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumIter,
    derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum GenerationOutcome {
    /// The inference service signalled completion
    #[display("completed")]
    Completed,
    /// The token budget ran out
    #[display("halted_by_limit")]
    HaltedByLimit,
    /// The client cancelled or disconnected
    #[display("cancelled")]
    Cancelled,
    /// The inference service failed mid-stream
    #[display("failed")]
    Failed,
}

/// User-facing classification of an error.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumIter,
    derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Inference service unreachable; the user may retry
    #[display("service_unavailable")]
    ServiceUnavailable,
    /// Requested model is not installed
    #[display("model_not_found")]
    ModelNotFound,
    /// Malformed upstream response
    #[display("protocol_error")]
    ProtocolError,
    /// Upstream reported an error
    #[display("upstream_error")]
    UpstreamError,
    /// Story could not be written
    #[display("write_error")]
    WriteError,
    /// Story exists but could not be read
    #[display("read_error")]
    ReadError,
    /// Story does not exist or the name is invalid
    #[display("not_found")]
    NotFound,
    /// The request itself is invalid
    #[display("invalid_request")]
    InvalidRequest,
    /// Anything else
    #[display("internal")]
    Internal,
}

impl ErrorCategory {
    /// Classify a Taleweaver error.
    pub fn of(err: &TaleweaverError) -> Self {
        match err.kind() {
            TaleweaverErrorKind::Inference(e) => match e.kind() {
                InferenceErrorKind::ServiceUnavailable(_) => ErrorCategory::ServiceUnavailable,
                InferenceErrorKind::ModelNotFound(_) => ErrorCategory::ModelNotFound,
                InferenceErrorKind::Protocol(_) => ErrorCategory::ProtocolError,
                InferenceErrorKind::Api(_) => ErrorCategory::UpstreamError,
            },
            TaleweaverErrorKind::Storage(e) => match e.kind() {
                StorageErrorKind::NotFound(_) => ErrorCategory::NotFound,
                StorageErrorKind::Write(_) => ErrorCategory::WriteError,
                StorageErrorKind::Read(_) | StorageErrorKind::Metadata(_) => {
                    ErrorCategory::ReadError
                }
                StorageErrorKind::DirectoryCreation(_) => ErrorCategory::Internal,
            },
            TaleweaverErrorKind::Request(_) | TaleweaverErrorKind::Builder(_) => {
                ErrorCategory::InvalidRequest
            }
            TaleweaverErrorKind::Config(_) | TaleweaverErrorKind::Server(_) => {
                ErrorCategory::Internal
            }
        }
    }

    /// Short advice shown next to the error.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            ErrorCategory::ServiceUnavailable => {
                Some("Make sure Ollama is running (ollama serve) and try again.")
            }
            ErrorCategory::ModelNotFound => {
                Some("Pick one of the available models, or pull it with: ollama pull <model>")
            }
            _ => None,
        }
    }
}

/// Summary of a finished generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationReport {
    /// How generation ended
    pub outcome: GenerationOutcome,
    /// Stored story the text went to, if it was persisted
    pub filename: Option<String>,
    /// Text generated by this request
    pub full_story: String,
    /// Units counted against the budget
    pub token_count: u32,
    /// Ceiling that applied
    pub token_limit: u32,
    /// Upstream failure that ended generation, for `Failed`
    pub error: Option<String>,
    /// Category of `error`
    pub error_category: Option<ErrorCategory>,
    /// Persistence problem that did not lose the text
    pub warning: Option<String>,
}

impl GenerationReport {
    /// Whether the token budget ended generation.
    pub fn token_limit_reached(&self) -> bool {
        self.outcome == GenerationOutcome::HaltedByLimit
    }
}

/// Events emitted while a generation runs.
///
/// Zero or more `Chunk`s are followed by exactly one `Finished`. A request
/// rejected before generation starts emits a single `Error` instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GenerationEvent {
    /// A fragment of text forwarded to the client
    Chunk {
        /// Text within the budget
        text: String,
        /// Units counted so far
        token_count: u32,
    },
    /// Generation ended
    Finished(GenerationReport),
    /// The request was rejected before any text was generated
    Error {
        /// User-facing message
        message: String,
        /// Error classification
        category: ErrorCategory,
        /// Installed models, when the requested one is missing
        available_models: Vec<String>,
    },
}

impl GenerationEvent {
    /// Whether this is the last event of a generation.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GenerationEvent::Chunk { .. })
    }
}
