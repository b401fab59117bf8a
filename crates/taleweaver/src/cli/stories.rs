//! Stored story commands.

use super::StoryCommands;
use taleweaver::{FileSystemStoryStore, StoryStore, TaleweaverConfig};

/// Handle a `stories` subcommand.
pub async fn handle_stories_command(
    config: TaleweaverConfig,
    command: StoryCommands,
) -> anyhow::Result<()> {
    let store = FileSystemStoryStore::new(&config.storage.output_dir)?;

    match command {
        StoryCommands::List => {
            let stories = store.list().await?;
            if stories.is_empty() {
                println!("No stories in {}", store.base_path().display());
                return Ok(());
            }
            for story in stories {
                println!(
                    "{}  {:>8}  {}",
                    story.modified.format("%Y-%m-%d %H:%M:%S"),
                    story.size,
                    story.name
                );
            }
        }

        StoryCommands::Show { filename } => {
            let content = store.load(&filename).await?;
            println!("{}", content);
        }
    }

    Ok(())
}
