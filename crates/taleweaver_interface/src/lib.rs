//! Trait definitions for the Taleweaver story generator.
//!
//! The orchestrator talks to the inference service and the story store only
//! through these traits, so either side can be replaced by a fake in tests.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod traits;

pub use traits::{FragmentStream, InferenceDriver, StoryStore};
