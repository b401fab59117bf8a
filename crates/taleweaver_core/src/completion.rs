//! Wire-independent request and fragment types for inference drivers.

use serde::{Deserialize, Serialize};

/// Sampling settings forwarded to the inference service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingOptions {
    /// Maximum tokens the service may generate
    pub num_predict: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Nucleus sampling cutoff
    pub top_p: f32,
    /// Sequences that end generation
    pub stop: Vec<String>,
}

impl Default for SamplingOptions {
    fn default() -> Self {
        Self {
            num_predict: 1000,
            temperature: 0.8,
            top_p: 0.9,
            stop: ["\n\n", "###", "END", "The End", "THE END"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// A fully built prompt ready to send to a driver.
///
/// # Examples
///
/// ```
/// use taleweaver_core::{CompletionRequest, SamplingOptions};
///
/// let request = CompletionRequest {
///     model: "llama2".to_string(),
///     prompt: "Tell me a story".to_string(),
///     options: SamplingOptions::default(),
/// };
///
/// assert_eq!(request.options.num_predict, 1000);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model identifier
    pub model: String,
    /// Prompt text
    pub prompt: String,
    /// Sampling settings
    pub options: SamplingOptions,
}

/// One incremental piece of generated text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fragment {
    /// Generated text (may be empty on the final fragment)
    pub text: String,
    /// Whether the service signalled completion with this fragment
    pub done: bool,
}

impl Fragment {
    /// A fragment carrying text.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            done: false,
        }
    }

    /// The completion marker, optionally carrying trailing text.
    pub fn done(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            done: true,
        }
    }
}
