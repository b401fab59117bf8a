//! Connection settings for the Ollama client.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use taleweaver_core::SamplingOptions;

/// Ollama connection and sampling settings.
///
/// # Examples
///
/// ```
/// use taleweaver_models::OllamaConfig;
///
/// let config = OllamaConfig::builder()
///     .base_url("http://127.0.0.1:11434")
///     .default_model("llama2")
///     .build()
///     .unwrap();
///
/// assert_eq!(config.request_timeout().as_secs(), 60);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters, derive_builder::Builder)]
#[builder(setter(into), default)]
#[serde(default)]
pub struct OllamaConfig {
    /// Base URL of the Ollama server
    base_url: String,
    /// Model used when a request names none
    default_model: String,
    /// Timeout for connecting and for non-streaming calls, in seconds
    request_timeout_secs: u64,
    /// Timeout for status probes, in seconds
    status_timeout_secs: u64,
    /// Sampling temperature
    temperature: f32,
    /// Nucleus sampling cutoff
    top_p: f32,
    /// Sequences that end generation
    stop: Vec<String>,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        let sampling = SamplingOptions::default();
        Self {
            base_url: "http://localhost:11434".to_string(),
            default_model: "llama2".to_string(),
            request_timeout_secs: 60,
            status_timeout_secs: 5,
            temperature: sampling.temperature,
            top_p: sampling.top_p,
            stop: sampling.stop,
        }
    }
}

impl OllamaConfig {
    /// Create a builder starting from the defaults.
    pub fn builder() -> OllamaConfigBuilder {
        OllamaConfigBuilder::default()
    }

    /// Timeout for connecting and for non-streaming calls.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Timeout for status probes.
    pub fn status_timeout(&self) -> Duration {
        Duration::from_secs(self.status_timeout_secs)
    }

    /// Sampling options for a request allowed to produce `num_predict` tokens.
    pub fn sampling(&self, num_predict: u32) -> SamplingOptions {
        SamplingOptions {
            num_predict,
            temperature: self.temperature,
            top_p: self.top_p,
            stop: self.stop.clone(),
        }
    }
}
