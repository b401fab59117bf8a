//! Status command.

use taleweaver::{StoryServer, TaleweaverConfig};

/// Print the Ollama server status and installed models.
pub async fn show_status(config: TaleweaverConfig) -> anyhow::Result<()> {
    let base_url = config.ollama.base_url().clone();
    let server = StoryServer::from_config(config)?;
    let status = server.orchestrator().status().await;

    if !status.running {
        println!("Ollama is not reachable at {}", base_url);
        if let Some(error) = &status.error {
            println!("  {}", error);
        }
        println!("Start it with: ollama serve");
        anyhow::bail!("inference service unavailable");
    }

    println!("Ollama is running at {}", base_url);
    println!("Default model: {}", status.default_model);

    if status.models.is_empty() {
        println!("No models installed. Try one of:");
        for model in &status.recommended_uncensored {
            println!("  ollama pull {}", model);
        }
        return Ok(());
    }

    println!("Standard models:");
    for model in &status.categories.standard {
        println!("  {}", model);
    }
    println!("Uncensored models:");
    for model in &status.categories.uncensored {
        println!("  {}", model);
    }
    Ok(())
}
