//! Ollama backend.

mod client;
mod config;
mod wire;

pub use client::OllamaClient;
pub use config::{OllamaConfig, OllamaConfigBuilder};
