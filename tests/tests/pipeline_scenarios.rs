//! End-to-end pipeline scenarios against the mock source and sink.
//!
//! All tests run on tokio's paused clock, so interval-driven flushes are
//! observed at exact instants without real waiting.

use integration_tests::fixtures::{malformed_payload, mistyped_payload, valid_payloads};
use integration_tests::mocks::{Exhausted, MockSink, MockSource, SinkFailure};
use pipeline::{Pipeline, PipelineConfig, PipelineReport, Termination};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const FIVE_MINUTES: Duration = Duration::from_secs(300);

fn spawn_pipeline(
    source: &MockSource,
    sink: &MockSink,
    batch_size: usize,
    cancel: &CancellationToken,
) -> JoinHandle<PipelineReport> {
    let config = PipelineConfig::new(batch_size, FIVE_MINUTES);
    let pipeline = Pipeline::new(Arc::new(source.clone()), sink.clone(), config).unwrap();
    let cancel = cancel.clone();
    tokio::spawn(async move { pipeline.run(cancel).await.unwrap() })
}

async fn run_to_completion(source: &MockSource, sink: &MockSink, batch_size: usize) -> PipelineReport {
    spawn_pipeline(source, sink, batch_size, &CancellationToken::new())
        .await
        .unwrap()
}

/// Polls on the paused clock until `done` holds.
async fn wait_until(mut done: impl FnMut() -> bool) {
    for _ in 0..1_000 {
        if done() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

/// Batch of five with five valid events: one size-triggered flush, five commits.
#[tokio::test(start_paused = true)]
async fn test_full_batch_flushes_without_waiting_for_interval() {
    let source = MockSource::blocking(valid_payloads(5));
    let sink = MockSink::new();
    let cancel = CancellationToken::new();
    let started = Instant::now();

    let task = spawn_pipeline(&source, &sink, 5, &cancel);
    wait_until(|| source.committed().len() == 5).await;

    let batches = sink.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].events.len(), 5);
    assert_eq!(batches[0].target, "analytics");
    assert!(batches[0].sent_at - started < FIVE_MINUTES);
    assert_eq!(source.committed(), vec![0, 1, 2, 3, 4]);

    cancel.cancel();
    let report = task.await.unwrap();
    assert_eq!(report.termination, Termination::Cancelled);
    assert_eq!(report.committed, 5);
    assert_eq!(sink.batch_sizes(), vec![5]);
}

/// Batch of five, two valid events, then cancellation: one flush of two.
#[tokio::test(start_paused = true)]
async fn test_cancel_drains_partial_batch() {
    let source = MockSource::blocking(valid_payloads(2));
    let sink = MockSink::new();
    let cancel = CancellationToken::new();

    let task = spawn_pipeline(&source, &sink, 5, &cancel);
    wait_until(|| source.fetched_count() == 2).await;
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(sink.batch_sizes().is_empty());

    cancel.cancel();
    let report = task.await.unwrap();

    assert_eq!(sink.batch_sizes(), vec![2]);
    assert_eq!(source.committed(), vec![0, 1]);
    assert_eq!(report.committed, 2);
    assert_eq!(report.batches_flushed, 1);
}

/// A single malformed payload is never batched and never committed.
#[tokio::test(start_paused = true)]
async fn test_malformed_payload_is_dropped() {
    let source = MockSource::closing(vec![malformed_payload()]);
    let sink = MockSink::new();

    let report = run_to_completion(&source, &sink, 5).await;

    assert_eq!(report.termination, Termination::SourceClosed);
    assert_eq!(report.transformed, 1);
    assert_eq!(report.dropped, 1);
    assert_eq!(report.committed, 0);
    assert!(sink.batches().is_empty());
    assert!(source.committed().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_partial_batch_flushes_after_one_interval() {
    let source = MockSource::blocking(valid_payloads(3));
    let sink = MockSink::new();
    let cancel = CancellationToken::new();
    let started = Instant::now();

    let task = spawn_pipeline(&source, &sink, 5, &cancel);

    tokio::time::sleep(FIVE_MINUTES - Duration::from_millis(1)).await;
    assert!(sink.batches().is_empty());
    assert!(source.committed().is_empty());

    wait_until(|| source.committed().len() == 3).await;
    let batches = sink.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].sent_at - started, FIVE_MINUTES);

    cancel.cancel();
    let report = task.await.unwrap();
    assert_eq!(report.batches_flushed, 1);
}

#[tokio::test(start_paused = true)]
async fn test_back_to_back_events_flush_in_full_batches() {
    let source = MockSource::closing(valid_payloads(12));
    let sink = MockSink::new();

    let report = run_to_completion(&source, &sink, 5).await;

    assert_eq!(sink.batch_sizes(), vec![5, 5, 2]);
    assert_eq!(report.rows_loaded, 12);
    assert_eq!(source.committed(), (0..12).collect::<Vec<_>>());
}

#[tokio::test(start_paused = true)]
async fn test_failed_batch_commits_nothing() {
    for failure in [SinkFailure::Prepare, SinkFailure::Append, SinkFailure::Send] {
        let source = MockSource::closing(valid_payloads(5));
        let sink = MockSink::new();
        sink.set_failure(Some(failure));

        let report = run_to_completion(&source, &sink, 5).await;

        assert_eq!(report.batches_failed, 1, "{:?}", failure);
        assert_eq!(report.dropped, 5, "{:?}", failure);
        assert_eq!(report.committed, 0, "{:?}", failure);
        assert!(source.committed().is_empty(), "{:?}", failure);
        assert!(sink.batches().is_empty(), "{:?}", failure);
    }
}

#[tokio::test(start_paused = true)]
async fn test_only_error_free_envelopes_are_committed() {
    let source = MockSource::new(Exhausted::Close);
    source.push_all(valid_payloads(2));
    source.push(mistyped_payload());
    source.push_all(valid_payloads(2));
    source.push(malformed_payload());

    let sink = MockSink::new();
    let report = run_to_completion(&source, &sink, 2).await;

    assert_eq!(report.transformed, 6);
    assert_eq!(report.committed, 4);
    assert_eq!(report.dropped, 2);
    assert_eq!(source.committed(), vec![0, 1, 3, 4]);
    assert_eq!(sink.row_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_commit_failure_does_not_halt_pipeline() {
    let source = MockSource::closing(valid_payloads(4));
    source.fail_commit(1);
    let sink = MockSink::new();

    let report = run_to_completion(&source, &sink, 2).await;

    assert_eq!(report.commit_failures, 1);
    assert_eq!(report.committed, 3);
    assert_eq!(source.committed(), vec![0, 2, 3]);
}

#[tokio::test(start_paused = true)]
async fn test_source_failure_drains_and_reports() {
    let source = MockSource::new(Exhausted::Fail);
    source.push_all(valid_payloads(3));
    let sink = MockSink::new();

    let report = run_to_completion(&source, &sink, 5).await;

    assert!(report.termination.is_failure());
    assert_eq!(sink.batch_sizes(), vec![3]);
    assert_eq!(report.committed, 3);
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let source = Arc::new(MockSource::new(Exhausted::Close));
    let config = PipelineConfig::new(5, Duration::ZERO);
    assert!(Pipeline::new(source, MockSink::new(), config).is_err());
}
