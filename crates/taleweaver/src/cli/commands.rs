//! CLI command definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use taleweaver::{TaleweaverConfig, TaleweaverResult};

/// Taleweaver - generate and continue stories with a local Ollama server
#[derive(Parser, Debug)]
#[command(name = "taleweaver")]
#[command(about = "Generate and continue stories with a local Ollama server", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Configuration file layered over the bundled defaults
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Load configuration from `--config` or the standard locations.
    pub fn load_config(&self) -> TaleweaverResult<TaleweaverConfig> {
        match &self.config {
            Some(path) => TaleweaverConfig::load_from_file(path),
            None => TaleweaverConfig::load(),
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the web interface
    Serve {
        /// Interface to bind (overrides server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides server.port)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Generate a story and stream it to stdout
    Generate {
        /// Story prompt, or the direction when continuing
        prompt: String,

        /// Model to use (defaults to ollama.default_model)
        #[arg(short, long)]
        model: Option<String>,

        /// Token limit, clamped into the configured range
        #[arg(short = 't', long)]
        max_tokens: Option<u32>,

        /// Stored story to continue
        #[arg(long = "continue", value_name = "FILENAME")]
        continue_from: Option<String>,
    },

    /// Stored story commands
    #[command(subcommand)]
    Stories(StoryCommands),

    /// Check the Ollama server and list installed models
    Status,
}

/// Stored story subcommands
#[derive(Subcommand, Debug)]
pub enum StoryCommands {
    /// List stored stories, most recent first
    List,

    /// Print a stored story
    Show {
        /// Story filename
        filename: String,
    },
}
