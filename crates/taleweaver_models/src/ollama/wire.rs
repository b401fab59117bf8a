//! Ollama HTTP wire types and NDJSON decoding.

use serde::{Deserialize, Serialize};
use taleweaver_core::{CompletionRequest, Fragment, SamplingOptions};
use taleweaver_error::{InferenceError, InferenceErrorKind, InferenceResult};

/// Body of `POST /api/generate`.
#[derive(Debug, Serialize)]
pub(crate) struct GenerateBody<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub stream: bool,
    pub options: &'a SamplingOptions,
}

impl<'a> GenerateBody<'a> {
    pub fn new(req: &'a CompletionRequest, stream: bool) -> Self {
        Self {
            model: &req.model,
            prompt: &req.prompt,
            stream,
            options: &req.options,
        }
    }
}

/// One line of a generate response.
#[derive(Debug, Deserialize)]
pub(crate) struct GenerateLine {
    pub response: Option<String>,
    pub done: Option<bool>,
    pub error: Option<String>,
}

/// Body of `GET /api/tags`.
#[derive(Debug, Deserialize)]
pub(crate) struct TagsResponse {
    #[serde(default)]
    pub models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ModelTag {
    pub name: String,
}

/// Error body Ollama sends with non-success statuses.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: String,
}

/// Map an upstream error message to an error kind.
pub(crate) fn classify_upstream_error(message: &str, model: &str) -> InferenceErrorKind {
    if message.to_lowercase().contains("not found") {
        InferenceErrorKind::ModelNotFound(model.to_string())
    } else {
        InferenceErrorKind::Api(message.to_string())
    }
}

/// Decode one NDJSON line. Blank lines decode to `None`.
pub(crate) fn decode_line(line: &[u8], model: &str) -> InferenceResult<Option<Fragment>> {
    let text = std::str::from_utf8(line).map_err(|e| {
        InferenceError::new(InferenceErrorKind::Protocol(format!(
            "Invalid UTF-8 in stream: {}",
            e
        )))
    })?;
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    let line: GenerateLine = serde_json::from_str(text).map_err(|e| {
        InferenceError::new(InferenceErrorKind::Protocol(format!(
            "Malformed stream line: {}",
            e
        )))
    })?;

    if let Some(message) = line.error {
        return Err(InferenceError::new(classify_upstream_error(&message, model)));
    }

    match (line.response, line.done.unwrap_or(false)) {
        (Some(text), done) => Ok(Some(Fragment { text, done })),
        (None, true) => Ok(Some(Fragment::done(""))),
        (None, false) => Err(InferenceError::new(InferenceErrorKind::Protocol(
            "Stream line carries neither text nor completion".to_string(),
        ))),
    }
}
