//! Terminal story generation.

use std::io::Write;
use taleweaver::{
    Continuation, GenerationEvent, GenerationOutcome, GenerationRequest, StoryServer,
    TaleweaverConfig,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// Generate a story, printing fragments as they arrive.
///
/// Ctrl-C stops generation; the text received so far is still saved.
#[instrument(skip(config, prompt))]
pub async fn generate_story(
    config: TaleweaverConfig,
    prompt: String,
    model: Option<String>,
    max_tokens: Option<u32>,
    continue_from: Option<String>,
) -> anyhow::Result<()> {
    let server = StoryServer::from_config(config)?;

    let mut builder = GenerationRequest::builder();
    builder.prompt(prompt);
    if let Some(model) = model {
        builder.model(model);
    }
    if let Some(max_tokens) = max_tokens {
        builder.max_tokens(max_tokens);
    }
    if let Some(filename) = continue_from {
        builder.continuation(Continuation {
            filename: Some(filename),
            previous_story: None,
        });
    }
    let request = builder.build()?;

    let (tx, mut rx) = mpsc::channel(64);
    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let orchestrator = server.orchestrator().clone();
    let task = tokio::spawn(async move { orchestrator.generate(request, tx, cancel).await });

    let mut stdout = std::io::stdout();
    while let Some(event) = rx.recv().await {
        let terminal = event.is_terminal();
        match event {
            GenerationEvent::Chunk { text, .. } => {
                write!(stdout, "{}", text)?;
                stdout.flush()?;
            }
            GenerationEvent::Finished(report) => {
                writeln!(stdout)?;
                eprintln!();
                eprintln!(
                    "[{}] {} of {} tokens",
                    report.outcome, report.token_count, report.token_limit
                );
                if let Some(filename) = &report.filename {
                    eprintln!("Saved to {}", filename);
                }
                if let Some(warning) = &report.warning {
                    eprintln!("Warning: {}", warning);
                }
                if report.outcome == GenerationOutcome::Failed {
                    if let Some(error) = &report.error {
                        eprintln!("Error: {}", error);
                    }
                    if let Some(hint) = report.error_category.and_then(|c| c.hint()) {
                        eprintln!("{}", hint);
                    }
                }
            }
            GenerationEvent::Error {
                message,
                category,
                available_models,
            } => {
                eprintln!("Error: {}", message);
                if !available_models.is_empty() {
                    eprintln!("Available models: {}", available_models.join(", "));
                }
                if let Some(hint) = category.hint() {
                    eprintln!("{}", hint);
                }
            }
        }
        if terminal {
            break;
        }
    }

    ctrl_c.abort();
    let report = task.await??;
    if report.outcome == GenerationOutcome::Failed {
        anyhow::bail!("generation failed");
    }
    Ok(())
}
