//! Fetch-drain scenarios: blocking poll, cancellation, group-commit
//! ordering, and the fake-fetch retention asymmetry.

use client_core::Offset;
use consumer::{AssignHow, Assignments};
use integration_tests::fixtures::{
    assignment, epoch_resp, fetch_with_records, poll_within, record, wait_until,
};
use integration_tests::mocks::{MockGroup, MockSource};
use integration_tests::setup::TestContext;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_poll_returns_empty_after_cancellation() {
    let ctx = TestContext::new();

    let token = CancellationToken::new();
    let cancel = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel.cancel();
    });

    let fetches = tokio::time::timeout(
        Duration::from_millis(500),
        ctx.consumer.poll_fetches(&token),
    )
    .await
    .expect("poll did not observe cancellation");
    assert!(fetches.is_empty());
}

#[tokio::test]
async fn test_poll_drains_ready_sources() {
    let ctx = TestContext::new();
    let source = MockSource::new();
    ctx.consumer.register_source(source.clone());

    source.buffer(fetch_with_records("T", 0, vec![record(5), record(6)]));
    ctx.consumer.source_ready(source.clone());

    let fetches = poll_within(&ctx.consumer).await;
    assert_eq!(fetches.record_count(), 2);
    let offsets: Vec<i64> = fetches.records().map(|(_, _, r)| r.offset).collect();
    assert_eq!(offsets, vec![5, 6]);
}

#[tokio::test]
async fn test_poll_wakes_when_a_source_becomes_ready() {
    let ctx = TestContext::new();
    let source = MockSource::new();
    ctx.consumer.register_source(source.clone());

    let consumer = ctx.consumer.clone();
    let poller = tokio::spawn(async move { poll_within(&consumer).await });

    tokio::time::sleep(Duration::from_millis(20)).await;
    source.buffer(fetch_with_records("T", 0, vec![record(1)]));
    ctx.consumer.source_ready(source.clone());

    let fetches = poller.await.unwrap();
    assert_eq!(fetches.record_count(), 1);
}

#[tokio::test]
async fn test_group_uncommitted_tracked_before_fetches_are_returned() {
    let ctx = TestContext::new();
    let group = MockGroup::new();
    ctx.consumer.assign_group(group.clone()).await;

    let source = MockSource::new();
    ctx.consumer.register_source(source.clone());
    source.buffer(fetch_with_records("T", 0, vec![record(5), record(6)]));
    ctx.consumer.source_ready(source.clone());

    let fetches = poll_within(&ctx.consumer).await;
    assert_eq!(fetches.record_count(), 2);
    assert_eq!(group.uncommitted_calls(), vec![2]);

    // An empty poll must not track anything.
    let empty = ctx.consumer.poll_fetches(&cancelled()).await;
    assert!(empty.is_empty());
    assert_eq!(group.uncommitted_calls(), vec![2]);
}

#[tokio::test]
async fn test_fake_fetches_survive_session_stop_but_buffers_do_not() {
    let ctx = TestContext::new();
    ctx.cluster.add_topic("T", &[(0, 1, 9)]);
    ctx.broker.queue_epoch_response(Ok(epoch_resp("T", 0, 800, 5)));

    // Queue a data-loss fake without polling it.
    ctx.consumer
        .apply_assignments(
            assignment("T", 0, Offset::new().at(1000).with_epoch(4)),
            AssignHow::Additive,
        )
        .await;
    let cursor = ctx.cluster.cursor("T", 0);
    let watched = cursor.clone();
    wait_until("cursor usable", move || watched.is_usable()).await;

    // A source with a buffered real fetch is ready alongside it.
    let source = MockSource::new();
    ctx.consumer.register_source(source.clone());
    source.buffer(fetch_with_records("T", 0, vec![record(800)]));
    ctx.consumer.source_ready(source.clone());

    ctx.consumer
        .apply_assignments(Assignments::new(), AssignHow::InvalidateAll)
        .await;
    assert!(source.discards.load(Ordering::SeqCst) >= 1);
    assert!(source.resets.load(Ordering::SeqCst) >= 1);

    // The buffered records are gone; the fatal error is not.
    let fetches = poll_within(&ctx.consumer).await;
    assert_eq!(fetches.record_count(), 0);
    let errors = fetches.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].topic, "T");
}

#[tokio::test]
async fn test_close_releases_poll_and_leaves_group() {
    let ctx = TestContext::new();
    let group = MockGroup::new();
    ctx.consumer.assign_group(group.clone()).await;
    ctx.cluster.add_topic("T", &[(0, 1, 0)]);
    ctx.consumer
        .apply_assignments(assignment("T", 0, Offset::new().at(3)), AssignHow::Additive)
        .await;

    ctx.consumer.close().await;
    ctx.consumer.close().await; // idempotent

    assert_eq!(group.leaves.load(Ordering::SeqCst), 1);
    assert!(!ctx.consumer.has_live_session());

    let fetches = tokio::time::timeout(
        Duration::from_millis(500),
        ctx.consumer.poll_fetches(&CancellationToken::new()),
    )
    .await
    .expect("poll did not observe close");
    assert!(fetches.is_empty());
}

fn cancelled() -> CancellationToken {
    let token = CancellationToken::new();
    token.cancel();
    token
}
