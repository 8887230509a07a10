//! Offset-resolution scenarios: list and epoch lookups, retries, seed
//! fallback, and load coalescing.

use broker_protocol::{
    ErrorCode, ListOffsetsResponse, ListOffsetsResponsePartition, ListOffsetsResponseTopic,
};
use client_core::{Error, Offset};
use consumer::AssignHow;
use integration_tests::fixtures::{
    assignment, epoch_err_resp, epoch_resp, list_resp, poll_within, wait_until,
};
use integration_tests::setup::TestContext;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn cancelled_token() -> CancellationToken {
    let token = CancellationToken::new();
    token.cancel();
    token
}

#[tokio::test]
async fn test_start_sentinel_resolves_through_list_offsets() {
    let ctx = TestContext::new();
    ctx.cluster.add_topic("T", &[(0, 1, 3)]);
    ctx.broker.queue_list_response(Ok(list_resp("T", 0, 42, 3)));

    ctx.consumer
        .apply_assignments(
            assignment("T", 0, Offset::new().at_start().relative(5)),
            AssignHow::Additive,
        )
        .await;

    let cursor = ctx.cluster.cursor("T", 0);
    let watched = cursor.clone();
    wait_until("cursor usable", move || watched.is_usable()).await;
    assert_eq!(cursor.position(), (47, 3));

    let requests = ctx.broker.list_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].replica_id, -1);
    let partition = &requests[0].topics[0].partitions[0];
    assert_eq!(partition.partition_index, 0);
    assert_eq!(partition.timestamp, -2);
    assert_eq!(partition.max_num_offsets, 1);
    assert_eq!(partition.current_leader_epoch, 3);

    // The assignment's lookup asked for an immediate refresh.
    assert_eq!(ctx.cluster.updates(), vec![true]);
}

#[tokio::test]
async fn test_epoch_truncation_surfaces_data_loss_once_and_resumes() {
    let ctx = TestContext::new();
    ctx.cluster.add_topic("T", &[(0, 1, 9)]);
    ctx.broker.queue_epoch_response(Ok(epoch_resp("T", 0, 800, 5)));

    ctx.consumer
        .apply_assignments(
            assignment("T", 0, Offset::new().at(1000).with_epoch(4)),
            AssignHow::Additive,
        )
        .await;

    let cursor = ctx.cluster.cursor("T", 0);
    let watched = cursor.clone();
    wait_until("cursor usable", move || watched.is_usable()).await;
    assert_eq!(cursor.position(), (800, 5));

    let requests = ctx.broker.epoch_requests();
    assert_eq!(requests.len(), 1);
    let partition = &requests[0].topics[0].partitions[0];
    assert_eq!(partition.current_leader_epoch, 9);
    assert_eq!(partition.leader_epoch, 4);

    // The loss reaches the user exactly once.
    let fetches = poll_within(&ctx.consumer).await;
    let errors = fetches.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].topic, "T");
    assert_eq!(errors[0].partition, 0);
    assert_eq!(errors[0].err, Error::DataLoss { end_offset: 800 });

    let again = ctx.consumer.poll_fetches(&cancelled_token()).await;
    assert!(again.is_empty());
}

#[tokio::test]
async fn test_retriable_error_reloads_without_fake_fetch() {
    let ctx = TestContext::new();
    ctx.cluster.add_topic("T", &[(0, 1, 9)]);
    ctx.broker.queue_epoch_response(Ok(epoch_err_resp(
        "T",
        0,
        ErrorCode::NotLeaderForPartition.code(),
    )));
    ctx.broker.queue_epoch_response(Ok(epoch_resp("T", 0, 4000, 5)));

    ctx.consumer
        .apply_assignments(
            assignment("T", 0, Offset::new().at(1000).with_epoch(4)),
            AssignHow::Additive,
        )
        .await;

    let cursor = ctx.cluster.cursor("T", 0);
    let watched = cursor.clone();
    wait_until("cursor usable after retry", move || watched.is_usable()).await;
    assert_eq!(cursor.position(), (1000, 5));

    // The retry kept the epoch kind and rode a lazy metadata trigger.
    assert_eq!(ctx.broker.epoch_requests().len(), 2);
    assert_eq!(ctx.broker.list_requests().len(), 0);
    assert_eq!(ctx.cluster.updates(), vec![true, false]);

    let fetches = ctx.consumer.poll_fetches(&cancelled_token()).await;
    assert!(fetches.errors().is_empty());
}

#[tokio::test]
async fn test_non_retriable_error_becomes_fake_fetch() {
    let ctx = TestContext::new();
    ctx.cluster.add_topic("T", &[(0, 1, 0)]);
    ctx.broker.queue_list_response(Ok(
        integration_tests::fixtures::list_err_resp("T", 0, ErrorCode::OffsetOutOfRange.code()),
    ));

    ctx.consumer
        .apply_assignments(assignment("T", 0, Offset::new().at_start()), AssignHow::Additive)
        .await;

    let fetches = poll_within(&ctx.consumer).await;
    let errors = fetches.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].err, Error::Code(ErrorCode::OffsetOutOfRange));
    assert!(!ctx.cluster.cursor("T", 0).is_usable());
    assert_eq!(ctx.broker.list_requests().len(), 1);
}

#[tokio::test]
async fn test_omitted_partition_is_retried() {
    let ctx = TestContext::new();
    ctx.cluster.add_topic("T", &[(0, 1, 0)]);
    ctx.broker.queue_list_response(Ok(ListOffsetsResponse::default()));
    ctx.broker.queue_list_response(Ok(list_resp("T", 0, 7, 0)));

    ctx.consumer
        .apply_assignments(assignment("T", 0, Offset::new().at_start()), AssignHow::Additive)
        .await;

    let cursor = ctx.cluster.cursor("T", 0);
    let watched = cursor.clone();
    wait_until("cursor usable after omitted partition", move || {
        watched.is_usable()
    })
    .await;
    assert_eq!(cursor.position(), (7, 0));
    assert_eq!(ctx.broker.list_requests().len(), 2);
}

#[tokio::test]
async fn test_unknown_leader_falls_back_to_seed_broker() {
    let ctx = TestContext::with_auto_update(false);
    let seed = ctx.cluster.seed();

    // The topic is not in metadata yet: the lookup routes to the seed.
    ctx.consumer
        .apply_assignments(assignment("T", 0, Offset::new().at_start()), AssignHow::Additive)
        .await;
    seed.queue_list_response(Ok(list_resp("T", 0, 11, 2)));
    ctx.complete_metadata_update();

    let cluster = ctx.cluster.clone();
    wait_until("reload cycle triggered", move || {
        cluster.updates().len() == 2
    })
    .await;
    assert_eq!(seed.request_count(), 1);

    // The listed offset could not apply without partition metadata; the
    // reload resolves once the leader is known.
    ctx.cluster.add_topic("T", &[(0, 1, 2)]);
    ctx.broker.queue_list_response(Ok(list_resp("T", 0, 11, 2)));
    ctx.complete_metadata_update();

    let cursor = ctx.cluster.cursor("T", 0);
    let watched = cursor.clone();
    wait_until("cursor usable via leader", move || watched.is_usable()).await;
    assert_eq!(cursor.position(), (11, 2));
    assert_eq!(ctx.broker.request_count(), 1);
    assert_eq!(seed.request_count(), 1);
}

#[tokio::test]
async fn test_concurrent_loads_coalesce_into_one_dispatch() {
    let ctx = TestContext::with_auto_update(false);
    ctx.cluster.add_topic("T", &[(0, 1, 0), (1, 1, 0)]);

    ctx.broker.queue_list_response(Ok(ListOffsetsResponse {
        throttle_time_ms: 0,
        topics: vec![ListOffsetsResponseTopic {
            topic: "T".to_string(),
            partitions: vec![
                ListOffsetsResponsePartition {
                    partition_index: 0,
                    offset: 5,
                    ..Default::default()
                },
                ListOffsetsResponsePartition {
                    partition_index: 1,
                    offset: 9,
                    ..Default::default()
                },
            ],
        }],
    }));

    // Two assignment waves land while the owning cycle still waits on the
    // metadata refresh; the second merges into the first.
    ctx.consumer
        .apply_assignments(assignment("T", 0, Offset::new().at_start()), AssignHow::Additive)
        .await;
    ctx.consumer
        .apply_assignments(assignment("T", 1, Offset::new().at_start()), AssignHow::Additive)
        .await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(ctx.cluster.updates().len(), 1);

    ctx.complete_metadata_update();

    let (c0, c1) = (ctx.cluster.cursor("T", 0), ctx.cluster.cursor("T", 1));
    let (w0, w1) = (c0.clone(), c1.clone());
    wait_until("both cursors usable", move || {
        w0.is_usable() && w1.is_usable()
    })
    .await;
    assert_eq!(c0.position().0, 5);
    assert_eq!(c1.position().0, 9);

    let requests = ctx.broker.list_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].topics[0].partitions.len(), 2);
}
