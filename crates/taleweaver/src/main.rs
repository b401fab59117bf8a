//! Taleweaver CLI binary.
//!
//! - Serve the web interface
//! - Generate a story from the terminal
//! - List and print stored stories
//! - Check the Ollama server and installed models

use clap::Parser;
use taleweaver::{ObservabilityConfig, init_observability};

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use cli::{Cli, Commands, generate_story, handle_stories_command, serve, show_status};

    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let mut observability = ObservabilityConfig::new().with_json_logs(cli.json_logs);
    if cli.verbose {
        observability = observability.with_log_level("debug");
    }
    init_observability(observability)?;

    let config = cli.load_config()?;

    match cli.command {
        Commands::Serve { host, port } => {
            serve(config, host, port).await?;
        }

        Commands::Generate {
            prompt,
            model,
            max_tokens,
            continue_from,
        } => {
            generate_story(config, prompt, model, max_tokens, continue_from).await?;
        }

        Commands::Stories(stories_cmd) => {
            handle_stories_command(config, stories_cmd).await?;
        }

        Commands::Status => {
            show_status(config).await?;
        }
    }

    Ok(())
}
