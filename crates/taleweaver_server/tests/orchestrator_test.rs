//! Tests for the generation orchestrator.

mod common;

use common::{FakeDriver, ReadOnlyStore, orchestrator, run, story, streamed_text};
use std::sync::Arc;
use taleweaver_core::{
    Continuation, ErrorCategory, Fragment, GenerationEvent, GenerationOutcome, GenerationRequest,
    ModelCatalog, StoryKind, StoryMetadata, UnitEstimator, count_words,
};
use taleweaver_error::{InferenceError, InferenceErrorKind, TaleweaverErrorKind};
use taleweaver_interface::StoryStore;
use taleweaver_server::Orchestrator;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

fn request(prompt: &str, max_tokens: u32) -> GenerationRequest {
    GenerationRequest::builder()
        .prompt(prompt)
        .model("demo-model")
        .max_tokens(max_tokens)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_robot_story_halts_at_limit() {
    let words: Vec<String> = (0..150).map(|i| format!(" word{}", i)).collect();
    let fragments: Vec<&str> = words.iter().map(String::as_str).collect();
    let driver = Arc::new(FakeDriver::scripted(story(&fragments)));
    let (_dir, store, orchestrator) = orchestrator(driver.clone());

    let (result, events) = run(&orchestrator, request("A robot learns to paint", 100)).await;
    let report = result.unwrap();

    assert_eq!(report.outcome, GenerationOutcome::HaltedByLimit);
    assert!(report.token_limit_reached());
    assert_eq!(report.token_count, 100);
    assert_eq!(count_words(&report.full_story), 100);
    assert_eq!(streamed_text(&events), report.full_story);
    assert!(driver.stream_dropped());

    let requests = driver.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].model, "demo-model");
    assert_eq!(requests[0].options.num_predict, 200);
    assert!(requests[0].prompt.contains("A robot learns to paint"));

    let filename = report.filename.clone().unwrap();
    assert_eq!(store.load(&filename).await.unwrap(), report.full_story);
    assert_eq!(
        events.last(),
        Some(&GenerationEvent::Finished(report.clone()))
    );
}

#[tokio::test]
async fn test_short_story_completes() {
    let driver = Arc::new(FakeDriver::scripted(story(&[
        "The robot",
        " dipped its brush",
        " in blue.",
    ])));
    let (_dir, store, orchestrator) = orchestrator(driver);

    let (result, events) = run(&orchestrator, request("A robot learns to paint", 100)).await;
    let report = result.unwrap();

    assert_eq!(report.outcome, GenerationOutcome::Completed);
    assert!(!report.token_limit_reached());
    assert_eq!(report.full_story, "The robot dipped its brush in blue.");
    assert_eq!(report.token_count, 7);
    assert_eq!(events.len(), 4);
    assert!(
        matches!(&events[1], GenerationEvent::Chunk { text, token_count: 5 } if text == " dipped its brush")
    );

    let filename = report.filename.unwrap();
    assert!(filename.starts_with("story_"));
    let metadata = store.metadata(&filename).await.unwrap().unwrap();
    assert_eq!(metadata.model, "demo-model");
    assert_eq!(metadata.prompt, "A robot learns to paint");
}

#[tokio::test]
async fn test_limit_is_clamped_into_range() {
    let driver = Arc::new(FakeDriver::scripted(story(&["Short."])));
    let (_dir, _store, orchestrator) = orchestrator(driver.clone());

    let (result, _) = run(&orchestrator, request("tale", 5)).await;

    assert_eq!(result.unwrap().token_limit, 100);
    assert_eq!(driver.requests()[0].options.num_predict, 200);
}

#[tokio::test]
async fn test_fragment_estimator_passes_limit_through() {
    let fragments: Vec<&str> = vec![" tick"; 120];
    let driver = Arc::new(FakeDriver::scripted(story(&fragments)));
    let (_dir, _store, orchestrator) = orchestrator(driver.clone());
    let orchestrator = orchestrator.with_estimator(UnitEstimator::Fragments);

    let (result, _) = run(&orchestrator, request("clock", 100)).await;
    let report = result.unwrap();

    assert_eq!(report.outcome, GenerationOutcome::HaltedByLimit);
    assert_eq!(report.token_count, 100);
    assert_eq!(driver.requests()[0].options.num_predict, 100);
}

#[tokio::test]
async fn test_continuation_appends_to_stored_story() {
    let driver = Arc::new(FakeDriver::scripted(story(&[
        " A dragon",
        " landed on the tower.",
    ])));
    let (_dir, store, orchestrator) = orchestrator(driver.clone());
    let filename = store
        .save(
            "Once upon a time.",
            &StoryMetadata::new("demo-model", "Once upon a time"),
        )
        .await
        .unwrap();

    let request = GenerationRequest::builder()
        .prompt("add a dragon")
        .model("demo-model")
        .max_tokens(100u32)
        .continuation(Continuation {
            filename: Some(filename.clone()),
            previous_story: None,
        })
        .build()
        .unwrap();
    let (result, _) = run(&orchestrator, request).await;
    let report = result.unwrap();

    assert_eq!(report.outcome, GenerationOutcome::Completed);
    assert_eq!(report.filename.as_deref(), Some(filename.as_str()));

    let content = store.load(&filename).await.unwrap();
    assert!(content.starts_with("Once upon a time."));
    assert_eq!(
        content,
        "Once upon a time.\n\n A dragon landed on the tower."
    );

    let prompt = &driver.requests()[0].prompt;
    assert!(prompt.contains("Continue this story naturally: Once upon a time."));
    assert!(prompt.contains("Additional direction: add a dragon"));

    let metadata = store.metadata(&filename).await.unwrap().unwrap();
    assert_eq!(metadata.continuations.len(), 1);
    assert_eq!(metadata.continuations[0].direction, "add a dragon");
}

#[tokio::test]
async fn test_continuation_of_unsaved_text_creates_file() {
    let driver = Arc::new(FakeDriver::scripted(story(&["The dragon slept."])));
    let (_dir, store, orchestrator) = orchestrator(driver);

    let request = GenerationRequest::builder()
        .prompt("add a dragon")
        .continuation(Continuation {
            filename: None,
            previous_story: Some("Once upon a time.".to_string()),
        })
        .build()
        .unwrap();
    let (result, _) = run(&orchestrator, request).await;
    let report = result.unwrap();

    let filename = report.filename.unwrap();
    assert!(filename.starts_with("story_continuation_"));
    assert_eq!(
        store.load(&filename).await.unwrap(),
        "Once upon a time.\n\nThe dragon slept."
    );
    let metadata = store.metadata(&filename).await.unwrap().unwrap();
    assert_eq!(metadata.kind, StoryKind::Continuation);
}

#[tokio::test]
async fn test_continuation_of_missing_file_is_rejected() {
    let driver = Arc::new(FakeDriver::scripted(story(&["unused"])));
    let (_dir, _store, orchestrator) = orchestrator(driver.clone());

    let request = GenerationRequest::builder()
        .prompt("add a dragon")
        .continuation(Continuation {
            filename: Some("../../etc/passwd.txt".to_string()),
            previous_story: None,
        })
        .build()
        .unwrap();
    let (result, events) = run(&orchestrator, request).await;

    assert!(matches!(
        result.unwrap_err().kind(),
        TaleweaverErrorKind::Storage(e) if e.is_not_found()
    ));
    assert!(matches!(
        &events[..],
        [GenerationEvent::Error { category: ErrorCategory::NotFound, .. }]
    ));
    assert!(driver.requests().is_empty());
}

async fn saved_opening(store: &dyn StoryStore) -> String {
    store
        .save(
            "Once upon a time.",
            &StoryMetadata::new("demo-model", "Once upon a time"),
        )
        .await
        .unwrap()
}

fn continue_file(filename: &str, max_tokens: u32) -> GenerationRequest {
    GenerationRequest::builder()
        .prompt("add a dragon")
        .model("demo-model")
        .max_tokens(max_tokens)
        .continuation(Continuation {
            filename: Some(filename.to_string()),
            previous_story: None,
        })
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_cancelled_continuation_appends_received_text() {
    let (driver, upstream) = FakeDriver::live();
    let driver = Arc::new(driver);
    let (_dir, store, orchestrator) = orchestrator(driver.clone());
    let filename = saved_opening(&*store).await;
    let (tx, mut rx) = mpsc::channel(16);
    let cancel = CancellationToken::new();

    let task = {
        let orchestrator = orchestrator.clone();
        let cancel = cancel.clone();
        let request = continue_file(&filename, 100);
        tokio::spawn(async move { orchestrator.generate(request, tx, cancel).await })
    };

    for fragment in [" A dragon", " circled"] {
        upstream.send(Ok(Fragment::text(fragment))).unwrap();
        assert!(matches!(rx.recv().await, Some(GenerationEvent::Chunk { .. })));
    }
    cancel.cancel();

    let report = task.await.unwrap().unwrap();
    assert_eq!(report.outcome, GenerationOutcome::Cancelled);
    assert_eq!(report.filename.as_deref(), Some(filename.as_str()));

    let content = store.load(&filename).await.unwrap();
    assert!(content.starts_with("Once upon a time.\n\n"));
    assert_eq!(content, "Once upon a time.\n\n A dragon circled");

    let metadata = store.metadata(&filename).await.unwrap().unwrap();
    assert_eq!(metadata.continuations.len(), 1);
}

#[tokio::test]
async fn test_halted_continuation_appends_allowed_text() {
    let words: Vec<String> = (0..120).map(|i| format!(" word{}", i)).collect();
    let fragments: Vec<&str> = words.iter().map(String::as_str).collect();
    let driver = Arc::new(FakeDriver::scripted(story(&fragments)));
    let (_dir, store, orchestrator) = orchestrator(driver.clone());
    let filename = saved_opening(&*store).await;

    let (result, _) = run(&orchestrator, continue_file(&filename, 100)).await;
    let report = result.unwrap();

    assert_eq!(report.outcome, GenerationOutcome::HaltedByLimit);
    assert_eq!(report.filename.as_deref(), Some(filename.as_str()));
    assert!(driver.stream_dropped());

    let expected: String = words[..100].concat();
    let content = store.load(&filename).await.unwrap();
    assert!(content.starts_with("Once upon a time.\n\n"));
    assert_eq!(content, format!("Once upon a time.\n\n{}", expected));
}

#[tokio::test]
async fn test_failed_continuation_appends_partial_text() {
    let driver = Arc::new(FakeDriver::scripted(vec![
        Ok(Fragment::text(" A dragon")),
        Err(InferenceError::new(InferenceErrorKind::Protocol(
            "Malformed stream line".to_string(),
        ))),
    ]));
    let (_dir, store, orchestrator) = orchestrator(driver);
    let filename = saved_opening(&*store).await;

    let (result, _) = run(&orchestrator, continue_file(&filename, 100)).await;
    let report = result.unwrap();

    assert_eq!(report.outcome, GenerationOutcome::Failed);
    assert_eq!(
        store.load(&filename).await.unwrap(),
        "Once upon a time.\n\n A dragon"
    );
}

#[tokio::test]
async fn test_cancel_at_fragment_keeps_received_text() {
    let (driver, upstream) = FakeDriver::live();
    let driver = Arc::new(driver);
    let (_dir, store, orchestrator) = orchestrator(driver.clone());
    let (tx, mut rx) = mpsc::channel(16);
    let cancel = CancellationToken::new();

    let task = {
        let orchestrator = orchestrator.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            orchestrator
                .generate(request("A robot learns to paint", 100), tx, cancel)
                .await
        })
    };

    for fragment in ["Once", " upon", " a"] {
        upstream.send(Ok(Fragment::text(fragment))).unwrap();
        assert!(matches!(rx.recv().await, Some(GenerationEvent::Chunk { .. })));
    }
    cancel.cancel();

    let report = task.await.unwrap().unwrap();
    assert_eq!(report.outcome, GenerationOutcome::Cancelled);
    assert_eq!(report.full_story, "Once upon a");
    assert!(driver.stream_dropped());

    let stored = store.load(&report.filename.unwrap()).await.unwrap();
    assert_eq!(stored, "Once upon a");
    assert!(matches!(
        rx.recv().await,
        Some(GenerationEvent::Finished(r)) if r.outcome == GenerationOutcome::Cancelled
    ));
}

#[tokio::test]
async fn test_client_disconnect_cancels() {
    let (driver, upstream) = FakeDriver::live();
    let driver = Arc::new(driver);
    let (_dir, store, orchestrator) = orchestrator(driver.clone());
    let (tx, mut rx) = mpsc::channel(16);

    let task = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            orchestrator
                .generate(request("tale", 100), tx, CancellationToken::new())
                .await
        })
    };

    upstream.send(Ok(Fragment::text("The first"))).unwrap();
    assert!(rx.recv().await.is_some());
    upstream.send(Ok(Fragment::text(" line"))).unwrap();
    assert!(rx.recv().await.is_some());
    drop(rx);

    let report = task.await.unwrap().unwrap();
    assert_eq!(report.outcome, GenerationOutcome::Cancelled);
    assert!(driver.stream_dropped());
    assert_eq!(
        store.load(&report.filename.unwrap()).await.unwrap(),
        "The first line"
    );
}

#[tokio::test]
async fn test_unknown_model_lists_available() {
    let driver = Arc::new(FakeDriver::scripted(story(&["unused"])));
    let (_dir, store, orchestrator) = orchestrator(driver.clone());

    let request = GenerationRequest::builder()
        .prompt("tale")
        .model("ghost")
        .build()
        .unwrap();
    let (result, events) = run(&orchestrator, request).await;

    let err = result.unwrap_err();
    assert!(matches!(
        err.kind(),
        TaleweaverErrorKind::Inference(e)
            if e.kind() == &InferenceErrorKind::ModelNotFound("ghost".to_string())
    ));
    match &events[..] {
        [
            GenerationEvent::Error {
                category,
                available_models,
                ..
            },
        ] => {
            assert_eq!(*category, ErrorCategory::ModelNotFound);
            assert_eq!(
                available_models,
                &vec!["demo-model".to_string(), "dolphin-mistral:latest".to_string()]
            );
        }
        other => panic!("unexpected events: {:?}", other),
    }
    assert!(driver.requests().is_empty());
    assert!(store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_prompt_is_rejected() {
    let driver = Arc::new(FakeDriver::scripted(story(&["unused"])));
    let (_dir, _store, orchestrator) = orchestrator(driver.clone());

    let (result, events) = run(&orchestrator, request("   ", 100)).await;

    assert!(matches!(
        result.unwrap_err().kind(),
        TaleweaverErrorKind::Request(_)
    ));
    assert!(matches!(
        &events[..],
        [GenerationEvent::Error { category: ErrorCategory::InvalidRequest, .. }]
    ));
    assert!(driver.requests().is_empty());
}

#[tokio::test]
async fn test_unreachable_service() {
    let driver = Arc::new(FakeDriver::unreachable());
    let (_dir, _store, orchestrator) = orchestrator(driver);

    let (result, events) = run(&orchestrator, request("tale", 100)).await;

    assert!(result.is_err());
    assert!(matches!(
        &events[..],
        [GenerationEvent::Error { category: ErrorCategory::ServiceUnavailable, .. }]
    ));

    let status = orchestrator.status().await;
    assert!(!status.running);
    assert!(status.error.is_some());
}

#[tokio::test]
async fn test_mid_stream_failure_keeps_partial_text() {
    let driver = Arc::new(FakeDriver::scripted(vec![
        Ok(Fragment::text("The robot")),
        Ok(Fragment::text(" painted")),
        Err(InferenceError::new(InferenceErrorKind::Protocol(
            "Malformed stream line".to_string(),
        ))),
    ]));
    let (_dir, store, orchestrator) = orchestrator(driver);

    let (result, _) = run(&orchestrator, request("tale", 100)).await;
    let report = result.unwrap();

    assert_eq!(report.outcome, GenerationOutcome::Failed);
    assert_eq!(report.error_category, Some(ErrorCategory::ProtocolError));
    assert!(report.error.unwrap().contains("Malformed"));
    assert_eq!(
        store.load(&report.filename.unwrap()).await.unwrap(),
        "The robot painted"
    );
}

#[tokio::test]
async fn test_stream_ending_without_done_is_failure() {
    let driver = Arc::new(FakeDriver::scripted(vec![Ok(Fragment::text("Half a"))]));
    let (_dir, _store, orchestrator) = orchestrator(driver);

    let (result, _) = run(&orchestrator, request("tale", 100)).await;
    let report = result.unwrap();

    assert_eq!(report.outcome, GenerationOutcome::Failed);
    assert_eq!(report.full_story, "Half a");
}

#[tokio::test]
async fn test_empty_output_is_not_saved() {
    let driver = Arc::new(FakeDriver::scripted(story(&[])));
    let (_dir, store, orchestrator) = orchestrator(driver);

    let (result, events) = run(&orchestrator, request("tale", 100)).await;
    let report = result.unwrap();

    assert_eq!(report.outcome, GenerationOutcome::Completed);
    assert!(report.filename.is_none());
    assert_eq!(events.len(), 1);
    assert!(store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_write_failure_keeps_text_and_warns() {
    let driver = Arc::new(FakeDriver::scripted(story(&["A tale", " worth keeping."])));
    let orchestrator = Orchestrator::new(
        driver,
        Arc::new(ReadOnlyStore),
        Arc::new(ModelCatalog::default()),
        "demo-model",
    );

    let (result, _) = run(&orchestrator, request("tale", 100)).await;
    let report = result.unwrap();

    assert_eq!(report.outcome, GenerationOutcome::Completed);
    assert_eq!(report.full_story, "A tale worth keeping.");
    assert!(report.filename.is_none());
    assert!(report.warning.unwrap().contains("read-only"));
}

#[tokio::test]
async fn test_uncensored_model_gets_unrestricted_prompt() {
    let driver = Arc::new(FakeDriver::scripted(story(&["Done."])));
    let (_dir, _store, orchestrator) = orchestrator(driver.clone());

    let request = GenerationRequest::builder()
        .prompt("a heist")
        .model("dolphin-mistral")
        .build()
        .unwrap();
    let (result, _) = run(&orchestrator, request).await;

    assert!(result.is_ok());
    let sent = &driver.requests()[0];
    assert_eq!(sent.model, "dolphin-mistral");
    assert!(sent.prompt.starts_with("You are an uncensored storyteller"));
}
