//! Streaming Ollama client.

use super::OllamaConfig;
use super::wire::{ErrorBody, GenerateBody, TagsResponse, classify_upstream_error, decode_line};
use futures_util::{Stream, StreamExt};
use reqwest::StatusCode;
use taleweaver_core::{CompletionRequest, Fragment};
use taleweaver_error::{InferenceError, InferenceErrorKind, InferenceResult};
use taleweaver_interface::{FragmentStream, InferenceDriver};
use tracing::{debug, error, instrument, warn};

/// Client for a local Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    config: OllamaConfig,
    client: reqwest::Client,
}

impl OllamaClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    #[instrument(skip(config), fields(base_url = %config.base_url()))]
    pub fn new(config: OllamaConfig) -> InferenceResult<Self> {
        debug!("Creating Ollama client");
        let client = reqwest::Client::builder()
            .connect_timeout(config.request_timeout())
            .build()
            .map_err(|e| {
                InferenceError::new(InferenceErrorKind::Api(format!(
                    "Failed to build HTTP client: {}",
                    e
                )))
            })?;
        Ok(Self { config, client })
    }

    /// Get the client configuration.
    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url().trim_end_matches('/'), path)
    }

    fn send_error(&self, e: reqwest::Error) -> InferenceError {
        if e.is_connect() || e.is_timeout() {
            warn!(error = %e, "Ollama server unreachable");
            InferenceError::new(InferenceErrorKind::ServiceUnavailable(
                self.config.base_url().clone(),
            ))
        } else {
            error!(error = %e, "Request to Ollama failed");
            InferenceError::new(InferenceErrorKind::Api(format!("Request failed: {}", e)))
        }
    }

    /// Turn a non-success response into an error.
    async fn check_status(
        response: reqwest::Response,
        model: &str,
    ) -> InferenceResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or_else(|_| format!("Ollama returned {}", status));
        error!(%status, %message, "Ollama returned an error status");

        let kind = if status == StatusCode::NOT_FOUND {
            InferenceErrorKind::ModelNotFound(model.to_string())
        } else {
            match classify_upstream_error(&message, model) {
                InferenceErrorKind::Api(_) => {
                    InferenceErrorKind::Api(format!("{} ({})", message, status))
                }
                other => other,
            }
        };
        Err(InferenceError::new(kind))
    }

    async fn post_generate(
        &self,
        req: &CompletionRequest,
        stream: bool,
    ) -> InferenceResult<reqwest::Response> {
        let mut builder = self
            .client
            .post(self.url("/api/generate"))
            .json(&GenerateBody::new(req, stream));
        if !stream {
            builder = builder.timeout(self.config.request_timeout());
        }

        let response = builder.send().await.map_err(|e| self.send_error(e))?;
        Self::check_status(response, &req.model).await
    }
}

/// Decode an NDJSON body into fragments.
///
/// Ends after the fragment marked `done`, or with one error item.
fn parse_ndjson_stream(
    response: reqwest::Response,
    model: String,
) -> impl Stream<Item = InferenceResult<Fragment>> {
    async_stream::stream! {
        let mut body = Box::pin(response.bytes_stream());
        let mut buffer: Vec<u8> = Vec::new();

        loop {
            let at_end = match body.next().await {
                Some(Ok(bytes)) => {
                    buffer.extend_from_slice(&bytes);
                    false
                }
                Some(Err(e)) => {
                    yield Err(InferenceError::new(InferenceErrorKind::Protocol(format!(
                        "Stream interrupted: {}",
                        e
                    ))));
                    return;
                }
                None => true,
            };

            loop {
                let line: Vec<u8> = match buffer.iter().position(|b| *b == b'\n') {
                    Some(pos) => buffer.drain(..=pos).collect(),
                    None if at_end && !buffer.is_empty() => std::mem::take(&mut buffer),
                    None => break,
                };

                match decode_line(&line, &model) {
                    Ok(None) => {}
                    Ok(Some(fragment)) => {
                        let done = fragment.done;
                        yield Ok(fragment);
                        if done {
                            return;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Rejected stream line");
                        yield Err(e);
                        return;
                    }
                }
            }

            if at_end {
                yield Err(InferenceError::new(InferenceErrorKind::Protocol(
                    "Stream ended without a completion signal".to_string(),
                )));
                return;
            }
        }
    }
}

#[async_trait::async_trait]
impl InferenceDriver for OllamaClient {
    fn provider_name(&self) -> &'static str {
        "ollama"
    }

    #[instrument(skip(self))]
    async fn list_models(&self) -> InferenceResult<Vec<String>> {
        let response = self
            .client
            .get(self.url("/api/tags"))
            .timeout(self.config.status_timeout())
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        if !response.status().is_success() {
            let status = response.status();
            error!(%status, "Model listing failed");
            return Err(InferenceError::new(InferenceErrorKind::Api(format!(
                "Ollama returned {} for the model list",
                status
            ))));
        }

        let tags: TagsResponse = response.json().await.map_err(|e| {
            InferenceError::new(InferenceErrorKind::Protocol(format!(
                "Malformed model list: {}",
                e
            )))
        })?;

        let models: Vec<String> = tags.models.into_iter().map(|m| m.name).collect();
        debug!(count = models.len(), "Listed local models");
        Ok(models)
    }

    #[instrument(skip(self, req), fields(model = %req.model, num_predict = req.options.num_predict))]
    async fn generate(&self, req: &CompletionRequest) -> InferenceResult<String> {
        let response = self.post_generate(req, false).await?;
        let bytes = response.bytes().await.map_err(|e| self.send_error(e))?;

        match decode_line(&bytes, &req.model)? {
            Some(fragment) => {
                debug!(length = fragment.text.len(), "Received completion");
                Ok(fragment.text)
            }
            None => Err(InferenceError::new(InferenceErrorKind::Protocol(
                "Empty response body".to_string(),
            ))),
        }
    }

    #[instrument(skip(self, req), fields(model = %req.model, num_predict = req.options.num_predict))]
    async fn generate_stream(&self, req: &CompletionRequest) -> InferenceResult<FragmentStream> {
        let response = self.post_generate(req, true).await?;
        debug!("Streaming request accepted, decoding NDJSON");
        Ok(Box::pin(parse_ndjson_stream(response, req.model.clone())))
    }
}
