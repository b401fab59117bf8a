//! Web server command.

use taleweaver::{StoryServer, TaleweaverConfig};
use tracing::instrument;

/// Serve the web interface until Ctrl-C.
#[instrument(skip(config))]
pub async fn serve(
    mut config: TaleweaverConfig,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config.validate()?;

    println!(
        "Taleweaver is running at http://{}",
        config.server.bind_address()
    );
    println!("Using Ollama at {}", config.ollama.base_url());
    println!("Press Ctrl+C to stop");

    StoryServer::from_config(config)?.serve().await?;
    Ok(())
}
