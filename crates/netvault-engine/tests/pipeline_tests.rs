// Integration tests for the ingestion pipeline
// Covers FIFO commits, no-op resubmission, backpressure and queue closure

#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::{TimeZone, Utc};
use netvault_core::errors::ExErrorKind;
use netvault_core::logging_facility::init_test_capture;
use netvault_core::Snapshot;
use netvault_core_types::schema::{EVENT_END_ERROR, OP_PERSIST_SNAPSHOT};
use netvault_engine::IngestionPipeline;
use netvault_store::{MemoryBackend, MemoryHandle, VersionedStore};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

async fn setup_store() -> (TempDir, Arc<VersionedStore>, MemoryHandle) {
    let dir = TempDir::new().expect("Failed to create temp archive");
    let (backend, handle) = MemoryBackend::with_remote(dir.path(), "mem://origin");
    let store = Arc::new(VersionedStore::new(backend));
    store.initialize().await.unwrap();
    (dir, store, handle)
}

fn snapshot_at(identity: &str, payload: &str, hour: u32) -> Snapshot {
    Snapshot::new(identity, payload)
        .unwrap()
        .with_captured_at(Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap())
}

async fn wait_for_slots(pipeline: &IngestionPipeline, slots: usize) {
    let submitter = pipeline.submitter();
    tokio::time::timeout(Duration::from_secs(5), async {
        while submitter.available_slots() != slots {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("queue never reached expected free slots");
}

#[tokio::test]
async fn test_distinct_devices_are_committed_under_their_classification() {
    // Given: A running pipeline
    let (_dir, store, handle) = setup_store().await;
    let pipeline = IngestionPipeline::start(store, 10);
    let submitter = pipeline.submitter();

    // When: Snapshots for a core and a label device are submitted
    submitter
        .submit(snapshot_at("co01.test01", "cfg-core", 8))
        .await
        .unwrap();
    submitter
        .submit(snapshot_at("LA01.test01", "cfg-label", 8))
        .await
        .unwrap();
    let report = pipeline.shutdown().await.unwrap();

    // Then: Each lands at its classified path with a timestamp header
    assert_eq!(report.committed, 2);
    assert_eq!(
        handle.committed("Core/co01.test01"),
        Some(b"2024-03-01T08:00:00Z\ncfg-core".to_vec())
    );
    assert_eq!(
        handle.committed("Label/LA01.test01"),
        Some(b"2024-03-01T08:00:00Z\ncfg-label".to_vec())
    );
}

#[tokio::test]
async fn test_identical_snapshots_produce_one_revision() {
    // Given: One snapshot submitted many times
    let (_dir, store, handle) = setup_store().await;
    let pipeline = IngestionPipeline::start(store, 4);
    let submitter = pipeline.submitter();
    let snapshot = snapshot_at("co01.test01", "cfg-A", 9);

    // When: All copies are processed
    for _ in 0..10 {
        submitter.submit(snapshot.clone()).await.unwrap();
    }
    let report = pipeline.shutdown().await.unwrap();

    // Then: Only the first records a revision
    assert_eq!(report.committed, 1);
    assert_eq!(report.unchanged, 9);
    assert_eq!(handle.revision_count(), 1);
    assert_eq!(
        handle.revisions()[0].message,
        "Updated configuration for device co01.test01"
    );
}

#[tokio::test]
async fn test_same_device_commits_follow_submission_order() {
    // Given: Two configurations for one device
    let (_dir, store, handle) = setup_store().await;
    let pipeline = IngestionPipeline::start(store, 10);
    let submitter = pipeline.submitter();

    // When: They are submitted back to back
    submitter
        .submit(snapshot_at("co01.test01", "cfg-A", 8))
        .await
        .unwrap();
    submitter
        .submit(snapshot_at("co01.test01", "cfg-B", 9))
        .await
        .unwrap();
    pipeline.shutdown().await.unwrap();

    // Then: The later one is the archived content, after two revisions
    assert_eq!(handle.revision_count(), 2);
    assert_eq!(
        handle.committed("Core/co01.test01"),
        Some(b"2024-03-01T09:00:00Z\ncfg-B".to_vec())
    );
}

#[tokio::test]
async fn test_full_queue_blocks_submit_until_space() {
    // Given: A single-slot queue whose worker is stuck behind a held session
    let (_dir, store, handle) = setup_store().await;
    let pipeline = IngestionPipeline::start(store.clone(), 1);
    let submitter = pipeline.submitter();
    let session = store.session().await;

    submitter
        .submit(snapshot_at("co01.test01", "a", 8))
        .await
        .unwrap();
    wait_for_slots(&pipeline, 1).await;
    submitter
        .submit(snapshot_at("co02.test01", "b", 8))
        .await
        .unwrap();

    // When: Another producer submits while the queue is full
    let blocked = tokio::time::timeout(
        Duration::from_millis(100),
        submitter.submit(snapshot_at("co03.test01", "c", 8)),
    )
    .await;

    // Then: The submit waits instead of failing or dropping anything
    assert!(blocked.is_err());
    assert_eq!(submitter.available_slots(), 0);
    assert_eq!(handle.revision_count(), 0);

    // And: Once the archive frees up, everything is committed
    drop(session);
    submitter
        .submit(snapshot_at("co03.test01", "c", 8))
        .await
        .unwrap();
    let report = pipeline.shutdown().await.unwrap();
    assert_eq!(report.committed, 3);
}

#[tokio::test]
async fn test_submit_after_close_is_rejected() {
    // Given: A closed pipeline
    let (_dir, store, _handle) = setup_store().await;
    let pipeline = IngestionPipeline::start(store, 10);
    let submitter = pipeline.submitter();
    pipeline.close();

    // When: A producer submits
    let err = submitter
        .submit(snapshot_at("co01.test01", "late", 8))
        .await
        .unwrap_err();

    // Then: The queue reports itself closed
    assert_eq!(err.kind(), ExErrorKind::QueueClosed);
    assert_eq!(err.code(), "ERR_QUEUE_CLOSED");
    assert!(submitter.is_closed());
    pipeline.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_close_drains_queued_snapshots() {
    // Given: Snapshots queued behind a held session
    let (_dir, store, handle) = setup_store().await;
    let pipeline = IngestionPipeline::start(store.clone(), 10);
    let submitter = pipeline.submitter();
    let session = store.session().await;
    for n in 1..=3 {
        submitter
            .submit(snapshot_at(&format!("co0{}.test01", n), "cfg", 8))
            .await
            .unwrap();
    }

    // When: The pipeline is closed before the worker could commit them
    pipeline.close();
    drop(session);
    let report = pipeline.shutdown().await.unwrap();

    // Then: Every accepted snapshot was still committed
    assert_eq!(report.committed, 3);
    assert_eq!(handle.revision_count(), 3);
}

#[tokio::test]
async fn test_waiting_producer_is_released_by_close() {
    // Given: A producer blocked on a full queue
    let (_dir, store, _handle) = setup_store().await;
    let pipeline = IngestionPipeline::start(store.clone(), 1);
    let submitter = pipeline.submitter();
    let session = store.session().await;
    submitter
        .submit(snapshot_at("co01.test01", "a", 8))
        .await
        .unwrap();
    wait_for_slots(&pipeline, 1).await;
    submitter
        .submit(snapshot_at("co02.test01", "b", 8))
        .await
        .unwrap();
    let waiting = {
        let submitter = submitter.clone();
        tokio::spawn(async move { submitter.submit(snapshot_at("co03.test01", "c", 8)).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    // When: The pipeline closes
    pipeline.close();

    // Then: The waiting producer gets a closed-queue error
    let err = waiting.await.unwrap().unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::QueueClosed);

    drop(session);
    let report = pipeline.shutdown().await.unwrap();
    assert_eq!(report.committed, 2);
}

#[tokio::test]
async fn test_failed_snapshot_does_not_stall_worker() {
    // Given: One device whose entry cannot be staged
    let capture = init_test_capture();
    let (_dir, store, handle) = setup_store().await;
    handle.fail_add("Core/co09.broken01");
    let pipeline = IngestionPipeline::start(store, 10);
    let submitter = pipeline.submitter();

    // When: It is submitted between two healthy devices
    submitter
        .submit(snapshot_at("co01.test01", "ok", 8))
        .await
        .unwrap();
    let broken = snapshot_at("co09.broken01", "bad", 8);
    let broken_request = broken.request_id().as_str().to_string();
    submitter.submit(broken).await.unwrap();
    submitter
        .submit(snapshot_at("co02.test01", "ok", 8))
        .await
        .unwrap();
    let report = pipeline.shutdown().await.unwrap();

    // Then: The failure is isolated and the others are committed
    assert_eq!(report.committed, 2);
    assert_eq!(report.failed, 1);
    assert!(handle.committed("Core/co02.test01").is_some());

    // And: The failure was logged with the snapshot's request id
    let failures = capture.count_events(|e| {
        e.op.as_deref() == Some(OP_PERSIST_SNAPSHOT)
            && e.event.as_deref() == Some(EVENT_END_ERROR)
            && e.field("request_id") == Some(broken_request.as_str())
            && e.field("err.code") == Some("ERR_COMMIT")
    });
    assert_eq!(failures, 1);
}

#[tokio::test]
async fn test_accept_rejects_invalid_identity_before_queueing() {
    // Given: A running pipeline
    let (_dir, store, handle) = setup_store().await;
    let pipeline = IngestionPipeline::start(store, 2);
    let submitter = pipeline.submitter();

    // When: A capture with a path-like identity arrives
    let err = submitter.accept("../etc/passwd", "x").await.unwrap_err();

    // Then: It is rejected without touching the queue
    assert_eq!(err.kind(), ExErrorKind::InvalidInput);
    assert_eq!(submitter.available_slots(), 2);

    // And: A valid capture is accepted with a request id
    let request_id = submitter.accept("la01.test01", "cfg").await.unwrap();
    assert!(!request_id.as_str().is_empty());
    pipeline.shutdown().await.unwrap();
    assert_eq!(handle.tracked_paths().len(), 1);
}
