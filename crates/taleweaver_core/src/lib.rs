//! Core data types for Taleweaver.
//!
//! This crate holds the value types shared across the workspace and the
//! token budget tracker that enforces generation limits.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod budget;
mod catalog;
mod completion;
mod limits;
mod outcome;
mod prompt;
mod request;
mod story;

pub use budget::{BudgetVerdict, Observation, TokenBudget, UnitEstimator, count_words};
pub use catalog::{ModelCatalog, ModelCategories};
pub use completion::{CompletionRequest, Fragment, SamplingOptions};
pub use limits::TokenLimitRange;
pub use outcome::{ErrorCategory, GenerationEvent, GenerationOutcome, GenerationReport};
pub use prompt::{Persona, StoryPrompt};
pub use request::{Continuation, GenerationRequest, GenerationRequestBuilder};
pub use story::{ContinuationRecord, StoryKind, StoryMetadata, StorySummary};
