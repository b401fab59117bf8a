//! Errors from assembling request and config values with builders.

/// Why a builder could not produce a value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum BuilderErrorKind {
    /// A required field was never set
    #[display("{} requires `{}`", target, field)]
    Uninitialized {
        /// Type being built
        target: &'static str,
        /// Field left unset
        field: &'static str,
    },

    /// A field was set to an unusable value
    #[display("Invalid {}: {}", target, reason)]
    Invalid {
        /// Type being built
        target: &'static str,
        /// What was wrong
        reason: String,
    },
}

/// Builder error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Builder Error: {} at line {} in {}", kind, line, file)]
pub struct BuilderError {
    kind: BuilderErrorKind,
    line: u32,
    file: &'static str,
}

impl BuilderError {
    /// Create a new builder error with caller location tracking.
    #[track_caller]
    pub fn new(kind: BuilderErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// A required field of `target` was never set.
    #[track_caller]
    pub fn uninitialized(target: &'static str, field: &'static str) -> Self {
        Self::new(BuilderErrorKind::Uninitialized { target, field })
    }

    /// A field of `target` held an unusable value.
    #[track_caller]
    pub fn invalid(target: &'static str, reason: impl Into<String>) -> Self {
        Self::new(BuilderErrorKind::Invalid {
            target,
            reason: reason.into(),
        })
    }

    /// Get the error kind.
    pub fn kind(&self) -> &BuilderErrorKind {
        &self.kind
    }
}
