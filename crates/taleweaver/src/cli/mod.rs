//! Command-line interface module.
//!
//! This module provides the CLI structure and command handlers for the taleweaver binary.

mod commands;
mod generate;
mod serve;
mod status;
mod stories;

pub use commands::{Cli, Commands, StoryCommands};
pub use generate::generate_story;
pub use serve::serve;
pub use status::show_status;
pub use stories::handle_stories_command;
