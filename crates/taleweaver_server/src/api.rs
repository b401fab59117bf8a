//! HTTP API.
//!
//! | Route                      | Response                                   |
//! |----------------------------|--------------------------------------------|
//! | `GET /`, `GET /status`     | inference service status and model lists   |
//! | `POST /generate`           | Server-Sent Events stream of the story     |
//! | `GET /files`               | stored stories, most recent first          |
//! | `GET /read_file/:filename` | story text as JSON                         |
//! | `GET /output/:filename`    | story text as a download                   |

use crate::orchestrator::{Orchestrator, user_message};
use axum::{
    Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{
        IntoResponse, Json, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::convert::Infallible;
use std::sync::Arc;
use taleweaver_core::{
    Continuation, ErrorCategory, GenerationEvent, GenerationOutcome, GenerationReport,
    GenerationRequest,
};
use taleweaver_error::{StorageError, StorageErrorKind, TaleweaverError};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

/// Events buffered between a generation task and its SSE response.
const EVENT_BUFFER: usize = 64;

/// API state shared by all handlers.
#[derive(Clone, Debug)]
pub struct ApiState {
    orchestrator: Arc<Orchestrator>,
}

impl ApiState {
    /// Creates new API state.
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }
}

/// Creates the application router.
pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(status))
        .route("/status", get(status))
        .route("/generate", post(generate))
        .route("/files", get(list_files))
        .route("/read_file/:filename", get(read_file))
        .route("/output/:filename", get(download))
        .with_state(state)
}

/// Error response with a status derived from the error category.
#[derive(Debug)]
pub struct ApiError(TaleweaverError);

impl From<TaleweaverError> for ApiError {
    fn from(err: TaleweaverError) -> Self {
        Self(err)
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        Self(err.into())
    }
}

/// HTTP status for an error category.
pub fn status_for(category: ErrorCategory) -> StatusCode {
    match category {
        ErrorCategory::NotFound | ErrorCategory::ModelNotFound => StatusCode::NOT_FOUND,
        ErrorCategory::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorCategory::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCategory::ProtocolError | ErrorCategory::UpstreamError => StatusCode::BAD_GATEWAY,
        ErrorCategory::WriteError | ErrorCategory::ReadError | ErrorCategory::Internal => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let category = ErrorCategory::of(&self.0);
        let mut body = Map::new();
        body.insert("error".into(), json!(user_message(&self.0)));
        body.insert("kind".into(), json!(category));
        if let Some(hint) = category.hint() {
            body.insert("hint".into(), json!(hint));
        }
        (status_for(category), Json(Value::Object(body))).into_response()
    }
}

/// Body of `POST /generate`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GenerateBody {
    /// Story prompt, or the direction of a continuation
    pub prompt: String,
    /// Model to use
    pub model: Option<String>,
    /// Requested unit limit
    pub max_tokens: Option<u32>,
    /// Whether this continues a story
    pub continuation: bool,
    /// Prior story text
    pub previous_story: Option<String>,
    /// Stored story to extend
    pub original_filename: Option<String>,
}

impl GenerateBody {
    fn into_request(self) -> Result<GenerationRequest, TaleweaverError> {
        let mut builder = GenerationRequest::builder();
        builder.prompt(self.prompt);
        if let Some(model) = self.model.filter(|m| !m.trim().is_empty()) {
            builder.model(model);
        }
        if let Some(max_tokens) = self.max_tokens {
            builder.max_tokens(max_tokens);
        }
        let original_filename = self.original_filename.filter(|f| !f.is_empty());
        if self.continuation || original_filename.is_some() {
            builder.continuation(Continuation {
                filename: original_filename,
                previous_story: self.previous_story,
            });
        }
        Ok(builder
            .build()
            .map_err(taleweaver_error::BuilderError::from)?)
    }
}

/// Status endpoint.
#[instrument(skip(state))]
async fn status(State(state): State<ApiState>) -> impl IntoResponse {
    Json(state.orchestrator.status().await)
}

/// Streaming generation endpoint.
#[instrument(skip(state, body), fields(model = ?body.model, continuation = body.continuation))]
async fn generate(State(state): State<ApiState>, Json(body): Json<GenerateBody>) -> Response {
    if body.prompt.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Please provide a story prompt"})),
        )
            .into_response();
    }
    let request = match body.into_request() {
        Ok(request) => request,
        Err(e) => return ApiError(e).into_response(),
    };

    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let orchestrator = state.orchestrator.clone();
    tokio::spawn(async move {
        // The SSE response going away closes the channel, which cancels the run.
        if let Err(e) = orchestrator
            .generate(request, tx, CancellationToken::new())
            .await
        {
            debug!(error = %e, "Generation rejected");
        }
    });

    let stream = ReceiverStream::new(rx)
        .map(|event| Ok::<_, Infallible>(Event::default().data(event_payload(&event).to_string())));
    Sse::new(stream)
        .keep_alive(KeepAlive::default())
        .into_response()
}

/// JSON carried by one SSE event.
pub fn event_payload(event: &GenerationEvent) -> Value {
    match event {
        GenerationEvent::Chunk { text, token_count } => json!({
            "chunk": text,
            "done": false,
            "token_count": token_count,
        }),
        GenerationEvent::Finished(report) => finished_payload(report),
        GenerationEvent::Error {
            message,
            category,
            available_models,
        } => {
            let mut payload = Map::new();
            payload.insert("error".into(), json!(message));
            payload.insert("kind".into(), json!(category));
            if !available_models.is_empty() {
                payload.insert("available_models".into(), json!(available_models));
            }
            if let Some(hint) = category.hint() {
                payload.insert("hint".into(), json!(hint));
            }
            Value::Object(payload)
        }
    }
}

fn finished_payload(report: &GenerationReport) -> Value {
    let mut payload = Map::new();
    if report.outcome == GenerationOutcome::Failed {
        payload.insert(
            "error".into(),
            json!(report.error.as_deref().unwrap_or("Generation failed")),
        );
        payload.insert(
            "kind".into(),
            json!(report.error_category.unwrap_or(ErrorCategory::Internal)),
        );
        payload.insert("partial_story".into(), json!(report.full_story));
        if let Some(hint) = report.error_category.and_then(|c| c.hint()) {
            payload.insert("hint".into(), json!(hint));
        }
    } else {
        payload.insert("chunk".into(), json!(""));
        payload.insert("full_story".into(), json!(report.full_story));
    }
    payload.insert("done".into(), json!(true));
    payload.insert("outcome".into(), json!(report.outcome));
    payload.insert("filename".into(), json!(report.filename));
    payload.insert("token_count".into(), json!(report.token_count));
    payload.insert(
        "token_limit_reached".into(),
        json!(report.token_limit_reached()),
    );
    if let Some(warning) = &report.warning {
        payload.insert("warning".into(), json!(warning));
    }
    Value::Object(payload)
}

/// Story listing endpoint.
#[instrument(skip(state))]
async fn list_files(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let files = state.orchestrator.store().list().await?;
    Ok(Json(json!({ "files": files })))
}

/// Story text endpoint.
#[instrument(skip(state))]
async fn read_file(
    State(state): State<ApiState>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let content = state.orchestrator.store().load(&filename).await?;
    Ok(Json(json!({ "content": content, "filename": filename })))
}

/// Story download endpoint.
#[instrument(skip(state))]
async fn download(
    State(state): State<ApiState>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let path = state.orchestrator.store().path_of(&filename)?;
    let content = tokio::fs::read(&path).await.map_err(|e| {
        StorageError::new(StorageErrorKind::Read(format!("{}: {}", path.display(), e)))
    })?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        content,
    ))
}
