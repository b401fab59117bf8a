//! Generation orchestrator and web API for Taleweaver.
//!
//! Requests arrive over HTTP, run through the [`Orchestrator`] against an
//! inference driver and a story store, and stream back as Server-Sent Events.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod api;
mod config;
mod observability;
mod orchestrator;
mod server;

pub use api::{ApiError, ApiState, GenerateBody, create_router, event_payload, status_for};
pub use config::{
    GenerationConfig, ModelsConfig, ServerConfig, StorageConfig, TaleweaverConfig,
};
pub use observability::{ObservabilityConfig, init_observability};
pub use orchestrator::{Orchestrator, ServiceStatus, user_message};
pub use server::StoryServer;
