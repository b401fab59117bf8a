//! Allowed range for per-request token limits.

use serde::{Deserialize, Serialize};
use taleweaver_error::ConfigError;

/// Bounds applied to the token limit a client asks for.
///
/// Requests outside the range are clamped rather than rejected; a request
/// without a limit gets the default.
///
/// # Examples
///
/// ```
/// use taleweaver_core::TokenLimitRange;
///
/// let range = TokenLimitRange::default();
/// assert_eq!(range.clamp(Some(50)), 100);
/// assert_eq!(range.clamp(Some(9000)), 4000);
/// assert_eq!(range.clamp(None), 1000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_getters::Getters)]
pub struct TokenLimitRange {
    /// Smallest accepted limit
    min_tokens: u32,
    /// Largest accepted limit
    max_tokens: u32,
    /// Limit used when the request names none
    default_tokens: u32,
}

impl Default for TokenLimitRange {
    fn default() -> Self {
        Self {
            min_tokens: 100,
            max_tokens: 4000,
            default_tokens: 1000,
        }
    }
}

impl TokenLimitRange {
    /// Create a validated range.
    ///
    /// # Errors
    ///
    /// Returns an error if the minimum is zero, the minimum exceeds the
    /// maximum, or the default lies outside the range.
    #[track_caller]
    pub fn new(min_tokens: u32, max_tokens: u32, default_tokens: u32) -> Result<Self, ConfigError> {
        if min_tokens == 0 {
            return Err(ConfigError::new("generation.min_tokens must be at least 1"));
        }
        if min_tokens > max_tokens {
            return Err(ConfigError::new(format!(
                "generation.min_tokens ({}) exceeds generation.max_tokens ({})",
                min_tokens, max_tokens
            )));
        }
        if !(min_tokens..=max_tokens).contains(&default_tokens) {
            return Err(ConfigError::new(format!(
                "generation.default_tokens ({}) must be within {}..={}",
                default_tokens, min_tokens, max_tokens
            )));
        }
        Ok(Self {
            min_tokens,
            max_tokens,
            default_tokens,
        })
    }

    /// Clamp a requested limit into the range.
    pub fn clamp(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.default_tokens)
            .clamp(self.min_tokens, self.max_tokens)
    }
}
