//! Inference service integrations for Taleweaver.
//!
//! Currently a single backend: a streaming client for a local Ollama server.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod ollama;

pub use ollama::{OllamaClient, OllamaConfig, OllamaConfigBuilder};
