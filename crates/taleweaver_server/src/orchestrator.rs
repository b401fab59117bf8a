//! Story generation orchestrator.
//!
//! One call to [`Orchestrator::generate`] moves through
//! Idle → Generating → {Completed, HaltedByLimit, Cancelled, Failed}.
//! Every fragment passes through a [`TokenBudget`] before it is forwarded,
//! and whatever text was produced is handed to the story store at the end,
//! however generation ended.

use chrono::Utc;
use futures::StreamExt;
use serde::Serialize;
use std::sync::Arc;
use taleweaver_core::{
    BudgetVerdict, CompletionRequest, ContinuationRecord, ErrorCategory, GenerationEvent,
    GenerationOutcome, GenerationReport, GenerationRequest, ModelCatalog, ModelCategories,
    SamplingOptions, StoryKind, StoryMetadata, StoryPrompt, TokenBudget, TokenLimitRange,
    UnitEstimator,
};
use taleweaver_error::{
    InferenceError, InferenceErrorKind, RequestError, RequestErrorKind, TaleweaverError,
    TaleweaverErrorKind, TaleweaverResult,
};
use taleweaver_interface::{InferenceDriver, StoryStore};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Where generated text is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    /// A new story file; `prefix` is prior text written ahead of the new text
    NewStory { kind: StoryKind, prefix: String },
    /// An existing story, extended with `separator` + new text
    Append {
        filename: String,
        separator: &'static str,
    },
}

/// A validated request ready to run.
#[derive(Debug)]
struct Prepared {
    model: String,
    direction: String,
    completion: CompletionRequest,
    budget: TokenBudget,
    target: Target,
}

/// A request refused before generation started.
#[derive(Debug)]
struct Rejection {
    error: TaleweaverError,
    available_models: Vec<String>,
}

impl Rejection {
    fn event(&self) -> GenerationEvent {
        GenerationEvent::Error {
            message: user_message(&self.error),
            category: ErrorCategory::of(&self.error),
            available_models: self.available_models.clone(),
        }
    }
}

fn reject(error: impl Into<TaleweaverError>) -> Rejection {
    Rejection {
        error: error.into(),
        available_models: Vec::new(),
    }
}

/// Inference service status for the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceStatus {
    /// Whether the inference service answered
    pub running: bool,
    /// Installed models
    pub models: Vec<String>,
    /// Installed models by classification
    pub categories: ModelCategories,
    /// Model used when a request names none
    pub default_model: String,
    /// Uncensored models worth installing
    pub recommended_uncensored: Vec<String>,
    /// Why the service could not be reached
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Drives generations from request to stored story.
#[derive(Clone)]
pub struct Orchestrator {
    driver: Arc<dyn InferenceDriver>,
    store: Arc<dyn StoryStore>,
    catalog: Arc<ModelCatalog>,
    limits: TokenLimitRange,
    estimator: UnitEstimator,
    default_model: String,
    sampling: SamplingOptions,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("driver", &self.driver.provider_name())
            .field("limits", &self.limits)
            .field("estimator", &self.estimator)
            .field("default_model", &self.default_model)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Create an orchestrator with default limits and sampling.
    pub fn new(
        driver: Arc<dyn InferenceDriver>,
        store: Arc<dyn StoryStore>,
        catalog: Arc<ModelCatalog>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            driver,
            store,
            catalog,
            limits: TokenLimitRange::default(),
            estimator: UnitEstimator::default(),
            default_model: default_model.into(),
            sampling: SamplingOptions::default(),
        }
    }

    /// Set the allowed token limit range.
    pub fn with_limits(mut self, limits: TokenLimitRange) -> Self {
        self.limits = limits;
        self
    }

    /// Set how text is counted against the limit.
    pub fn with_estimator(mut self, estimator: UnitEstimator) -> Self {
        self.estimator = estimator;
        self
    }

    /// Set sampling options; `num_predict` is derived per request.
    pub fn with_sampling(mut self, sampling: SamplingOptions) -> Self {
        self.sampling = sampling;
        self
    }

    /// The story store.
    pub fn store(&self) -> &Arc<dyn StoryStore> {
        &self.store
    }

    /// The model catalog.
    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    /// Model used when a request names none.
    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Probe the inference service.
    #[instrument(skip(self))]
    pub async fn status(&self) -> ServiceStatus {
        let (running, models, error) = match self.driver.list_models().await {
            Ok(models) => (true, models, None),
            Err(e) => {
                warn!(error = %e, "Inference service status probe failed");
                (false, Vec::new(), Some(e.kind().to_string()))
            }
        };
        ServiceStatus {
            running,
            categories: self.catalog.categorize(&models),
            models,
            default_model: self.default_model.clone(),
            recommended_uncensored: self.catalog.recommended_uncensored().to_vec(),
            error,
        }
    }

    /// Run one generation, emitting events as it goes.
    ///
    /// Sends zero or more `Chunk` events followed by one `Finished` event, or
    /// a single `Error` event if the request is rejected. Generation stops
    /// early when `cancel` fires or `events` is closed by the receiver.
    ///
    /// # Errors
    ///
    /// Returns the rejection error when the request is refused before
    /// generation starts. Failures during generation are reported in the
    /// returned report instead.
    #[instrument(
        skip(self, request, events, cancel),
        fields(
            model = tracing::field::Empty,
            limit = tracing::field::Empty,
            continuation = request.is_continuation()
        )
    )]
    pub async fn generate(
        &self,
        request: GenerationRequest,
        events: mpsc::Sender<GenerationEvent>,
        cancel: CancellationToken,
    ) -> TaleweaverResult<GenerationReport> {
        let prepared = match self.prepare(request).await {
            Ok(prepared) => prepared,
            Err(rejection) => {
                warn!(error = %rejection.error, "Generation request rejected");
                let _ = events.send(rejection.event()).await;
                return Err(rejection.error);
            }
        };

        tracing::Span::current()
            .record("model", prepared.model.as_str())
            .record("limit", prepared.budget.ceiling());

        let report = self.run(prepared, &events, &cancel).await;
        let _ = events.send(GenerationEvent::Finished(report.clone())).await;
        Ok(report)
    }

    /// Validate a request and build its prompt.
    async fn prepare(&self, request: GenerationRequest) -> Result<Prepared, Rejection> {
        let direction = request.prompt().trim().to_string();
        if direction.is_empty() {
            return Err(reject(RequestError::new(RequestErrorKind::EmptyPrompt)));
        }

        let limit = self.limits.clamp(*request.max_tokens());
        let budget = TokenBudget::new(limit, self.estimator).map_err(reject)?;

        let model = request
            .model()
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(self.default_model.as_str())
            .to_string();

        let available = self.driver.list_models().await.map_err(reject)?;
        if !is_available(&model, &available) {
            warn!(model = %model, available = ?available, "Requested model is not installed");
            return Err(Rejection {
                error: InferenceError::new(InferenceErrorKind::ModelNotFound(model)).into(),
                available_models: available,
            });
        }

        let prompt_builder = StoryPrompt::new(self.catalog.persona(&model));
        let (prompt, target) = match request.continuation() {
            Some(continuation) => {
                let stored = match &continuation.filename {
                    Some(filename) => Some((
                        filename.clone(),
                        self.store.load(filename).await.map_err(reject)?,
                    )),
                    None => None,
                };
                let previous = continuation
                    .previous_story
                    .clone()
                    .filter(|text| !text.trim().is_empty())
                    .or_else(|| stored.as_ref().map(|(_, text)| text.clone()));

                match (stored, previous) {
                    (Some((filename, content)), Some(previous)) => (
                        prompt_builder.continuation(&previous, &direction),
                        Target::Append {
                            filename,
                            separator: separator_after(&content),
                        },
                    ),
                    (None, Some(previous)) => (
                        prompt_builder.continuation(&previous, &direction),
                        Target::NewStory {
                            kind: StoryKind::Continuation,
                            prefix: format!("{}{}", previous, separator_after(&previous)),
                        },
                    ),
                    // Nothing to continue from: start a fresh story.
                    (_, None) => (
                        prompt_builder.opening(&direction),
                        Target::NewStory {
                            kind: StoryKind::Original,
                            prefix: String::new(),
                        },
                    ),
                }
            }
            None => (
                prompt_builder.opening(&direction),
                Target::NewStory {
                    kind: StoryKind::Original,
                    prefix: String::new(),
                },
            ),
        };

        let completion = CompletionRequest {
            model: model.clone(),
            prompt,
            options: SamplingOptions {
                num_predict: self.estimator.upstream_allowance(limit),
                ..self.sampling.clone()
            },
        };
        debug!(prompt_length = completion.prompt.len(), ?target, "Prepared generation");

        Ok(Prepared {
            model,
            direction,
            completion,
            budget,
            target,
        })
    }

    /// Stream, count, forward and persist.
    async fn run(
        &self,
        prepared: Prepared,
        events: &mpsc::Sender<GenerationEvent>,
        cancel: &CancellationToken,
    ) -> GenerationReport {
        let Prepared {
            model,
            direction,
            completion,
            mut budget,
            target,
        } = prepared;
        info!(model = %model, limit = budget.ceiling(), "Generation started");

        let mut text = String::new();
        let (outcome, failure) = match self.driver.generate_stream(&completion).await {
            Err(e) => (GenerationOutcome::Failed, Some(e)),
            Ok(mut stream) => loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break (GenerationOutcome::Cancelled, None),
                    _ = events.closed() => break (GenerationOutcome::Cancelled, None),
                    next = stream.next() => match next {
                        Some(Ok(fragment)) => {
                            let observation = budget.observe(&fragment.text);
                            if !observation.forwarded.is_empty() {
                                text.push_str(observation.forwarded);
                                let chunk = GenerationEvent::Chunk {
                                    text: observation.forwarded.to_string(),
                                    token_count: budget.used(),
                                };
                                if events.send(chunk).await.is_err() {
                                    break (GenerationOutcome::Cancelled, None);
                                }
                            }
                            if observation.verdict == BudgetVerdict::Halt {
                                break (GenerationOutcome::HaltedByLimit, None);
                            }
                            if fragment.done {
                                break (GenerationOutcome::Completed, None);
                            }
                        }
                        Some(Err(e)) => break (GenerationOutcome::Failed, Some(e)),
                        None => break (
                            GenerationOutcome::Failed,
                            Some(InferenceError::new(InferenceErrorKind::Protocol(
                                "Stream ended without a completion signal".to_string(),
                            ))),
                        ),
                    },
                }
            },
        };

        match &failure {
            Some(e) => warn!(error = %e, received = text.len(), "Generation failed"),
            None => info!(%outcome, units = budget.used(), "Generation finished"),
        }

        let (filename, warning) = self.persist(&model, &direction, target, &text).await;

        let (error, error_category) = match failure {
            Some(e) => {
                let message = e.kind().to_string();
                let category = ErrorCategory::of(&TaleweaverError::from(e));
                (Some(message), Some(category))
            }
            None => (None, None),
        };

        GenerationReport {
            outcome,
            filename,
            full_story: text,
            token_count: budget.used(),
            token_limit: budget.ceiling(),
            error,
            error_category,
            warning,
        }
    }

    /// Hand generated text to the store.
    ///
    /// Returns the story filename and a warning if storing failed.
    async fn persist(
        &self,
        model: &str,
        direction: &str,
        target: Target,
        text: &str,
    ) -> (Option<String>, Option<String>) {
        match target {
            Target::NewStory { .. } if text.trim().is_empty() => {
                debug!("Nothing generated; story not saved");
                (None, None)
            }
            Target::NewStory { kind, prefix } => {
                let metadata = StoryMetadata::new(model, direction).with_kind(kind);
                let content = format!("{}{}", prefix, text);
                match self.store.save(&content, &metadata).await {
                    Ok(filename) => (Some(filename), None),
                    Err(e) => {
                        warn!(error = %e, "Failed to save story");
                        (None, Some(format!("Story could not be saved: {}", e.kind())))
                    }
                }
            }
            Target::Append { filename, .. } if text.trim().is_empty() => {
                debug!(filename = %filename, "Nothing generated; story unchanged");
                (Some(filename), None)
            }
            Target::Append {
                filename,
                separator,
            } => {
                let addition = format!("{}{}", separator, text);
                if let Err(e) = self.store.append(&filename, &addition).await {
                    warn!(error = %e, filename = %filename, "Failed to append continuation");
                    return (
                        Some(filename),
                        Some(format!("Continuation could not be saved: {}", e.kind())),
                    );
                }

                let record = ContinuationRecord {
                    direction: direction.to_string(),
                    model: model.to_string(),
                    continued_at: Utc::now(),
                };
                match self.store.record_continuation(&filename, record).await {
                    Ok(()) => (Some(filename), None),
                    Err(e) => {
                        warn!(error = %e, filename = %filename, "Continuation saved without metadata");
                        (
                            Some(filename),
                            Some(format!("Story metadata could not be updated: {}", e.kind())),
                        )
                    }
                }
            }
        }
    }
}

/// Error text without source locations.
pub fn user_message(err: &TaleweaverError) -> String {
    match err.kind() {
        TaleweaverErrorKind::Inference(e) => e.kind().to_string(),
        TaleweaverErrorKind::Storage(e) => e.kind().to_string(),
        TaleweaverErrorKind::Request(e) => e.kind().to_string(),
        TaleweaverErrorKind::Config(e) => e.detail(),
        TaleweaverErrorKind::Builder(e) => e.kind().to_string(),
        TaleweaverErrorKind::Server(e) => e.kind.to_string(),
    }
}

/// Separator placed between existing text and appended text.
fn separator_after(existing: &str) -> &'static str {
    if existing.is_empty() || existing.ends_with('\n') {
        ""
    } else {
        "\n\n"
    }
}

/// Whether `model` names an installed model; a bare name matches its `:latest` tag.
fn is_available(model: &str, available: &[String]) -> bool {
    available
        .iter()
        .any(|name| name == model || name.strip_suffix(":latest") == Some(model))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separator() {
        assert_eq!(separator_after("Once upon a time."), "\n\n");
        assert_eq!(separator_after("Once upon a time.\n"), "");
        assert_eq!(separator_after(""), "");
    }

    #[test]
    fn test_model_availability() {
        let available = vec!["llama2:latest".to_string(), "mistral:7b".to_string()];
        assert!(is_available("llama2", &available));
        assert!(is_available("llama2:latest", &available));
        assert!(is_available("mistral:7b", &available));
        assert!(!is_available("mistral", &available));
        assert!(!is_available("llama", &available));
    }
}
