//! Taleweaver - local story generation over Ollama.
//!
//! Taleweaver sends story prompts to a locally running Ollama server, streams
//! the text back as it is generated, enforces a per-request token limit and
//! saves every story to a plain text file that can later be continued.
//!
//! # Crates
//!
//! - [`taleweaver_core`]: value types and the token budget tracker
//! - [`taleweaver_models`]: the streaming Ollama client
//! - [`taleweaver_storage`]: the filesystem story store
//! - [`taleweaver_server`]: the orchestrator, configuration and web API
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use taleweaver::{StoryServer, TaleweaverConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = TaleweaverConfig::load()?;
//!     StoryServer::from_config(config)?.serve().await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub use taleweaver_core::{
    BudgetVerdict, CompletionRequest, Continuation, ContinuationRecord, ErrorCategory, Fragment,
    GenerationEvent, GenerationOutcome, GenerationReport, GenerationRequest,
    GenerationRequestBuilder, ModelCatalog, ModelCategories, Observation, Persona,
    SamplingOptions, StoryKind, StoryMetadata, StoryPrompt, StorySummary, TokenBudget,
    TokenLimitRange, UnitEstimator, count_words,
};
pub use taleweaver_error::{
    BuilderError, BuilderErrorKind, ConfigError, ConfigErrorKind, InferenceError, InferenceErrorKind,
    InferenceResult, RequestError, RequestErrorKind, ServerError, ServerErrorKind, StorageError,
    StorageErrorKind, StorageResult, TaleweaverError, TaleweaverErrorKind, TaleweaverResult,
};
pub use taleweaver_interface::{FragmentStream, InferenceDriver, StoryStore};
pub use taleweaver_models::{OllamaClient, OllamaConfig, OllamaConfigBuilder};
pub use taleweaver_server::{
    ApiError, ApiState, GenerateBody, GenerationConfig, ModelsConfig, ObservabilityConfig,
    Orchestrator, ServerConfig, ServiceStatus, StorageConfig, StoryServer, TaleweaverConfig,
    create_router, event_payload, init_observability, status_for, user_message,
};
pub use taleweaver_storage::{
    FileSystemStoryStore, generate_filename, is_valid_filename, sanitize_prompt,
};
