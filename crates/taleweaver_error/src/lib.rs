//! Error types for Taleweaver.
//!
//! This crate provides the error types shared by every Taleweaver crate.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All constructors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use taleweaver_error::{StorageError, StorageErrorKind, TaleweaverResult};
//!
//! fn load_story() -> TaleweaverResult<String> {
//!     Err(StorageError::new(StorageErrorKind::NotFound("story.txt".to_string())))?
//! }
//!
//! match load_story() {
//!     Ok(text) => println!("{}", text),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod builder;
mod config;
mod error;
mod inference;
mod request;
mod server;
mod storage;

pub use builder::{BuilderError, BuilderErrorKind};
pub use config::{ConfigError, ConfigErrorKind};
pub use error::{TaleweaverError, TaleweaverErrorKind, TaleweaverResult};
pub use inference::{InferenceError, InferenceErrorKind, InferenceResult};
pub use request::{RequestError, RequestErrorKind};
pub use server::{ServerError, ServerErrorKind};
pub use storage::{StorageError, StorageErrorKind, StorageResult};
