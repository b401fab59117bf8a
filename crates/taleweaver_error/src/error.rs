//! Top-level error wrapper types.

use crate::{BuilderError, ConfigError, InferenceError, RequestError, ServerError, StorageError};

/// Every error a Taleweaver operation can produce.
///
/// # Examples
///
/// ```
/// use taleweaver_error::{ConfigError, TaleweaverError};
///
/// let err: TaleweaverError = ConfigError::new("ollama.base_url is empty").into();
/// assert!(format!("{}", err).contains("Configuration Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum TaleweaverErrorKind {
    /// Inference service error
    #[from(InferenceError)]
    Inference(InferenceError),
    /// Story storage error
    #[from(StorageError)]
    Storage(StorageError),
    /// Rejected generation request
    #[from(RequestError)]
    Request(RequestError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Builder error
    #[from(BuilderError)]
    Builder(BuilderError),
    /// Web server error
    #[from(ServerError)]
    Server(ServerError),
}

/// Taleweaver error with kind discrimination.
///
/// # Examples
///
/// ```
/// use taleweaver_error::{RequestError, RequestErrorKind, TaleweaverResult};
///
/// fn validate(prompt: &str) -> TaleweaverResult<()> {
///     if prompt.trim().is_empty() {
///         Err(RequestError::new(RequestErrorKind::EmptyPrompt))?
///     }
///     Ok(())
/// }
///
/// assert!(validate("   ").is_err());
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Taleweaver Error: {}", _0)]
pub struct TaleweaverError(Box<TaleweaverErrorKind>);

impl TaleweaverError {
    /// Create a new error from a kind.
    pub fn new(kind: TaleweaverErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &TaleweaverErrorKind {
        &self.0
    }
}

// Generic From implementation for any type that converts to TaleweaverErrorKind
impl<T> From<T> for TaleweaverError
where
    T: Into<TaleweaverErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Taleweaver operations.
pub type TaleweaverResult<T> = std::result::Result<T, TaleweaverError>;
