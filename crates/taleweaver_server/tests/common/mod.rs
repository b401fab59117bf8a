//! Test doubles shared by the server tests.

#![allow(dead_code)]

use futures::StreamExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use taleweaver_core::{
    CompletionRequest, ContinuationRecord, Fragment, GenerationEvent, GenerationReport,
    GenerationRequest, ModelCatalog, StoryMetadata, StorySummary,
};
use taleweaver_error::{
    InferenceError, InferenceErrorKind, InferenceResult, StorageError, StorageErrorKind,
    StorageResult, TaleweaverResult,
};
use taleweaver_interface::{FragmentStream, InferenceDriver, StoryStore};
use taleweaver_server::Orchestrator;
use taleweaver_storage::FileSystemStoryStore;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;

/// Sets a flag when dropped.
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Inference driver that replays scripted fragments or relays a live channel.
#[derive(Default)]
pub struct FakeDriver {
    models: Vec<String>,
    script: Mutex<Vec<InferenceResult<Fragment>>>,
    live: Mutex<Option<mpsc::UnboundedReceiver<InferenceResult<Fragment>>>>,
    unavailable: bool,
    requests: Mutex<Vec<CompletionRequest>>,
    dropped: Arc<AtomicBool>,
}

impl FakeDriver {
    /// A driver with `demo-model` installed and the given script.
    pub fn scripted(fragments: Vec<InferenceResult<Fragment>>) -> Self {
        Self {
            models: vec!["demo-model".to_string(), "dolphin-mistral:latest".to_string()],
            script: Mutex::new(fragments),
            ..Self::default()
        }
    }

    /// A driver whose fragments are pushed through the returned sender.
    pub fn live() -> (Self, mpsc::UnboundedSender<InferenceResult<Fragment>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let driver = Self {
            live: Mutex::new(Some(rx)),
            ..Self::scripted(Vec::new())
        };
        (driver, tx)
    }

    /// A driver that cannot be reached.
    pub fn unreachable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Requests sent upstream so far.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Whether the last stream handed out has been dropped.
    pub fn stream_dropped(&self) -> bool {
        self.dropped.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl InferenceDriver for FakeDriver {
    fn provider_name(&self) -> &'static str {
        "fake"
    }

    async fn list_models(&self) -> InferenceResult<Vec<String>> {
        if self.unavailable {
            return Err(InferenceError::new(InferenceErrorKind::ServiceUnavailable(
                "http://localhost:11434".to_string(),
            )));
        }
        Ok(self.models.clone())
    }

    async fn generate(&self, req: &CompletionRequest) -> InferenceResult<String> {
        self.requests.lock().unwrap().push(req.clone());
        let script = std::mem::take(&mut *self.script.lock().unwrap());
        let mut text = String::new();
        for item in script {
            text.push_str(&item?.text);
        }
        Ok(text)
    }

    async fn generate_stream(&self, req: &CompletionRequest) -> InferenceResult<FragmentStream> {
        self.requests.lock().unwrap().push(req.clone());
        let guard = DropFlag(self.dropped.clone());

        let live = self.live.lock().unwrap().take();
        let inner: FragmentStream = match live {
            Some(rx) => Box::pin(UnboundedReceiverStream::new(rx)),
            None => {
                let script = std::mem::take(&mut *self.script.lock().unwrap());
                Box::pin(futures::stream::iter(script))
            }
        };

        Ok(Box::pin(inner.map(move |item| {
            let _flag = &guard;
            item
        })))
    }
}

/// Story store whose writes always fail.
pub struct ReadOnlyStore;

#[async_trait::async_trait]
impl StoryStore for ReadOnlyStore {
    async fn save(&self, _content: &str, _metadata: &StoryMetadata) -> StorageResult<String> {
        Err(StorageError::new(StorageErrorKind::Write(
            "output: read-only file system".to_string(),
        )))
    }

    async fn list(&self) -> StorageResult<Vec<StorySummary>> {
        Ok(Vec::new())
    }

    async fn load(&self, filename: &str) -> StorageResult<String> {
        Err(StorageError::new(StorageErrorKind::NotFound(filename.to_string())))
    }

    async fn append(&self, filename: &str, _content: &str) -> StorageResult<String> {
        Err(StorageError::new(StorageErrorKind::NotFound(filename.to_string())))
    }

    async fn metadata(&self, filename: &str) -> StorageResult<Option<StoryMetadata>> {
        Err(StorageError::new(StorageErrorKind::NotFound(filename.to_string())))
    }

    async fn record_continuation(
        &self,
        filename: &str,
        _record: ContinuationRecord,
    ) -> StorageResult<()> {
        Err(StorageError::new(StorageErrorKind::NotFound(filename.to_string())))
    }

    fn path_of(&self, filename: &str) -> StorageResult<PathBuf> {
        Err(StorageError::new(StorageErrorKind::NotFound(filename.to_string())))
    }
}

/// Scripted text fragments followed by a completion marker.
pub fn story(fragments: &[&str]) -> Vec<InferenceResult<Fragment>> {
    fragments
        .iter()
        .map(|text| Ok(Fragment::text(*text)))
        .chain(std::iter::once(Ok(Fragment::done(""))))
        .collect()
}

/// Orchestrator over `driver` and a store in a fresh temporary directory.
pub fn orchestrator(
    driver: Arc<FakeDriver>,
) -> (TempDir, Arc<FileSystemStoryStore>, Orchestrator) {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(FileSystemStoryStore::new(temp_dir.path().join("output")).unwrap());
    let orchestrator = Orchestrator::new(
        driver,
        store.clone(),
        Arc::new(ModelCatalog::default()),
        "demo-model",
    );
    (temp_dir, store, orchestrator)
}

/// Run a generation to the end and collect its events.
pub async fn run(
    orchestrator: &Orchestrator,
    request: GenerationRequest,
) -> (TaleweaverResult<GenerationReport>, Vec<GenerationEvent>) {
    let (tx, mut rx) = mpsc::channel(1024);
    let result = orchestrator
        .generate(request, tx, CancellationToken::new())
        .await;
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    (result, events)
}

/// Concatenated text of all chunk events.
pub fn streamed_text(events: &[GenerationEvent]) -> String {
    events
        .iter()
        .filter_map(|event| match event {
            GenerationEvent::Chunk { text, .. } => Some(text.as_str()),
            _ => None,
        })
        .collect()
}
