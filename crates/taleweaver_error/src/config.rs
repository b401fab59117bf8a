//! Configuration errors.

use std::path::PathBuf;

/// What went wrong while loading configuration.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum ConfigErrorKind {
    /// An explicitly requested file does not exist
    #[display("Configuration file not found: {}", _0.display())]
    MissingFile(PathBuf),

    /// A layer could not be read or deserialized
    #[display("Failed to load configuration: {}", _0)]
    Load(String),

    /// A value was read but is out of range
    #[display("{}", _0)]
    Invalid(String),
}

/// Configuration error with source location.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Configuration Error: {} at line {} in {}", kind, line, file)]
pub struct ConfigError {
    kind: ConfigErrorKind,
    line: u32,
    file: &'static str,
}

impl ConfigError {
    /// An out-of-range value.
    ///
    /// # Examples
    ///
    /// ```
    /// use taleweaver_error::{ConfigError, ConfigErrorKind};
    ///
    /// let err = ConfigError::new("generation.min_tokens exceeds generation.max_tokens");
    /// assert!(matches!(err.kind(), ConfigErrorKind::Invalid(_)));
    /// assert!(err.detail().contains("min_tokens"));
    /// ```
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        Self::with_kind(ConfigErrorKind::Invalid(message.into()))
    }

    /// A requested configuration file that does not exist.
    #[track_caller]
    pub fn missing_file(path: impl Into<PathBuf>) -> Self {
        Self::with_kind(ConfigErrorKind::MissingFile(path.into()))
    }

    /// A layer that failed to parse.
    #[track_caller]
    pub fn load(message: impl Into<String>) -> Self {
        Self::with_kind(ConfigErrorKind::Load(message.into()))
    }

    #[track_caller]
    fn with_kind(kind: ConfigErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &ConfigErrorKind {
        &self.kind
    }

    /// The message without location details.
    pub fn detail(&self) -> String {
        self.kind.to_string()
    }
}
