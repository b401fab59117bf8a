//! Filesystem story storage for Taleweaver.
//!
//! Each story is a plain UTF-8 text file in a single output directory, with
//! its metadata in a JSON sidecar next to it.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod filesystem;
mod naming;

pub use filesystem::FileSystemStoryStore;
pub use naming::{generate_filename, is_valid_filename, sanitize_prompt};
