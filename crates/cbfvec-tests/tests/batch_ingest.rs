//! End-to-end batch ingestion against store doubles.

use std::sync::Arc;
use std::time::Duration;

use cbfvec_format::FormatError;
use cbfvec_ingest::{BatchIngestionController, IngestConfig, IngestError, ENGINE, METHOD};
use cbfvec_store::{PayloadValue, StoreError, VectorStore};
use cbfvec_tests::{ContainerFixture, FailingStore, FailureMode, RecordingStore};
use pretty_assertions::assert_eq;

const SIZE: usize = 8;

fn config(workers: usize) -> IngestConfig {
    IngestConfig {
        collection: "frames".to_string(),
        workers,
        target_size: SIZE,
        ..Default::default()
    }
}

// ============================================================================
// Happy path
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn every_file_is_stored_for_any_worker_count() {
    let fixture = ContainerFixture::new();
    let files = fixture.add_frames(6, 12, 9);

    for workers in 1..=files.len() {
        let store = Arc::new(RecordingStore::new());
        let controller = BatchIngestionController::new(store.clone(), config(workers)).unwrap();
        let report = controller.run_batch(fixture.path()).await;

        assert!(report.is_success(), "workers={workers}: {:?}", report.error);
        assert_eq!(report.attempted, files.len());
        assert_eq!(report.succeeded, files.len());
        assert_eq!(store.upsert_count(), files.len(), "workers={workers}");
        assert!(store.peak_in_flight() <= workers);
    }
}

#[tokio::test]
async fn upserts_carry_vector_and_metadata() {
    let fixture = ContainerFixture::new();
    let path = fixture.add_pattern("frame_a.cbf", 10, 6, 1);
    let raw = std::fs::read(&path).unwrap();

    let store = Arc::new(RecordingStore::new());
    let controller = BatchIngestionController::new(store.clone(), config(2)).unwrap();
    controller.run_batch(&path).await.into_result().unwrap();

    let upserts = store.upserts();
    assert_eq!(upserts.len(), 1);
    let upsert = &upserts[0];
    assert_eq!(upsert.collection, "frames");
    assert_eq!(upsert.dimension, SIZE * SIZE);
    assert_eq!(upsert.payload["filename"], PayloadValue::from("frame_a.cbf"));
    assert_eq!(upsert.payload["width"], PayloadValue::Integer(10));
    assert_eq!(upsert.payload["height"], PayloadValue::Integer(6));
    assert_eq!(upsert.payload["method"], PayloadValue::from(METHOD));
    assert_eq!(upsert.payload["engine"], PayloadValue::from(ENGINE));
    assert_eq!(
        upsert.payload["content_hash"],
        PayloadValue::from(blake3::hash(&raw).to_hex().to_string())
    );
}

#[tokio::test]
async fn existing_collection_is_not_recreated() {
    let fixture = ContainerFixture::new();
    fixture.add_frames(2, 4, 4);

    let store = Arc::new(RecordingStore::new());
    store.create_collection("frames", SIZE * SIZE).await.unwrap();
    let controller = BatchIngestionController::new(store.clone(), config(2)).unwrap();
    controller.run_batch(fixture.path()).await.into_result().unwrap();

    assert_eq!(store.info_calls(), 1);
    assert_eq!(store.create_calls(), 1);
}

#[tokio::test]
async fn non_matching_extensions_are_skipped() {
    let fixture = ContainerFixture::new();
    fixture.add_frames(2, 4, 4);
    fixture.add_file("README.txt", b"beamline notes");
    fixture.add_corrupt("frame_099.img");

    let store = Arc::new(RecordingStore::new());
    let controller = BatchIngestionController::new(store.clone(), config(2)).unwrap();
    let report = controller.run_batch(fixture.path()).await;

    assert!(report.is_success());
    assert_eq!(report.discovered, 2);
    assert_eq!(report.skipped, 2);
    assert_eq!(store.filenames(), vec!["frame_000.cbf", "frame_001.cbf"]);
}

#[tokio::test]
async fn empty_directory_succeeds_without_upserts() {
    let fixture = ContainerFixture::new();
    let store = Arc::new(RecordingStore::new());
    let controller = BatchIngestionController::new(store.clone(), config(3)).unwrap();

    let report = controller.run_batch(fixture.path()).await;
    assert!(report.is_success());
    assert_eq!(report.attempted, 0);
    assert_eq!(store.upsert_count(), 0);
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn corrupt_file_is_reported_once_with_its_path() {
    let fixture = ContainerFixture::new();
    fixture.add_frames(5, 6, 6);
    let bad = fixture.add_corrupt("frame_002b.cbf");

    for workers in [1, 2, 4] {
        let store = Arc::new(RecordingStore::new());
        let controller = BatchIngestionController::new(store.clone(), config(workers)).unwrap();
        let report = controller.run_batch(fixture.path()).await;

        assert_eq!(report.failed, 1, "workers={workers}");
        assert!(report.succeeded < report.discovered);
        assert_eq!(store.upsert_count(), report.succeeded);

        let err = report.error.expect("batch must fail");
        assert_eq!(err.path(), Some(bad.as_path()));
        assert!(matches!(
            err,
            IngestError::Decode {
                source: FormatError::MarkerNotFound,
                ..
            }
        ));
    }
}

#[tokio::test]
async fn truncated_file_fails_batch() {
    let fixture = ContainerFixture::new();
    let bad = fixture.add_truncated("cut.cbf", 16, 16);

    let store = Arc::new(RecordingStore::new());
    let controller = BatchIngestionController::new(store.clone(), config(2)).unwrap();
    let err = controller.run_batch(fixture.path()).await.into_result().unwrap_err();

    assert_eq!(err.path(), Some(bad.as_path()));
    assert_eq!(store.upsert_count(), 0);
}

#[tokio::test]
async fn lookup_failure_aborts_before_any_job() {
    let fixture = ContainerFixture::new();
    fixture.add_frames(3, 4, 4);

    let store = Arc::new(FailingStore::new(FailureMode::Lookup));
    let controller = BatchIngestionController::new(store.clone(), config(2)).unwrap();
    let report = controller.run_batch(fixture.path()).await;

    assert_eq!(report.discovered, 3);
    assert_eq!(report.attempted, 0);
    assert_eq!(store.upsert_attempts(), 0);
    assert!(matches!(
        report.error,
        Some(IngestError::CollectionProvisionFailed { .. })
    ));
}

#[tokio::test]
async fn create_failure_aborts_before_any_job() {
    let fixture = ContainerFixture::new();
    fixture.add_frames(2, 4, 4);

    let store = Arc::new(FailingStore::new(FailureMode::Create));
    let controller = BatchIngestionController::new(store.clone(), config(2)).unwrap();
    let err = controller.run_batch(fixture.path()).await.into_result().unwrap_err();

    assert_eq!(store.upsert_attempts(), 0);
    match err {
        IngestError::CollectionProvisionFailed { collection, source } => {
            assert_eq!(collection, "frames");
            assert!(matches!(source, StoreError::Api { status: 503, .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn upsert_failure_names_the_file() {
    let fixture = ContainerFixture::new();
    let files = fixture.add_frames(3, 4, 4);

    let store = Arc::new(FailingStore::new(FailureMode::UpsertFile(
        "frame_001.cbf".to_string(),
    )));
    let controller = BatchIngestionController::new(store.clone(), config(1)).unwrap();
    let report = controller.run_batch(fixture.path()).await;

    // One worker processes files in name order and stops at the failure.
    assert_eq!(report.attempted, 2);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.not_attempted(), 1);
    let err = report.error.expect("batch must fail");
    assert!(matches!(err, IngestError::UpsertFailed { .. }));
    assert_eq!(err.path(), Some(files[1].as_path()));
    assert_eq!(store.recorded().filenames(), vec!["frame_000.cbf"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn first_error_cancels_remaining_jobs() {
    let fixture = ContainerFixture::new();
    fixture.add_frames(20, 4, 4);

    let store = Arc::new(FailingStore::new(FailureMode::UpsertAll));
    let controller = BatchIngestionController::new(store.clone(), config(2)).unwrap();
    let report = controller.run_batch(fixture.path()).await;

    assert!(!report.is_success());
    // Each worker stops after its own failure; nothing new starts after cancel.
    assert!(report.attempted <= 2, "attempted {}", report.attempted);
    assert_eq!(report.failed, report.attempted);
    assert_eq!(store.upsert_attempts(), report.attempted);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn deadline_expiry_reports_timeout() {
    let fixture = ContainerFixture::new();
    fixture.add_frames(6, 4, 4);

    let store = Arc::new(RecordingStore::with_upsert_delay(Duration::from_millis(300)));
    let config = IngestConfig {
        round_timeout_ms: 10,
        timeout_margin_ms: 50,
        ..config(2)
    };
    let controller = BatchIngestionController::new(store.clone(), config).unwrap();
    let report = controller.run_batch(fixture.path()).await;

    match report.error {
        Some(IngestError::BatchTimeout { timeout, attempted }) => {
            assert_eq!(timeout, Duration::from_millis(80));
            assert_eq!(attempted, 2);
        }
        ref other => panic!("expected timeout, got {other:?}"),
    }
    // In-flight work is allowed to finish; nothing new starts.
    assert_eq!(report.attempted, 2);
    assert_eq!(store.upsert_count(), 2);
    assert_eq!(report.failed, 0);
}

#[tokio::test]
async fn slow_provisioning_counts_against_the_deadline() {
    let fixture = ContainerFixture::new();
    fixture.add_frames(3, 4, 4);

    let store = Arc::new(RecordingStore::with_lookup_delay(Duration::from_secs(2)));
    let config = IngestConfig {
        round_timeout_ms: 10,
        timeout_margin_ms: 50,
        ..config(3)
    };
    let controller = BatchIngestionController::new(store.clone(), config).unwrap();
    let report = controller.run_batch(fixture.path()).await;

    match report.error {
        Some(IngestError::BatchTimeout { timeout, attempted }) => {
            assert_eq!(timeout, Duration::from_millis(60));
            assert_eq!(attempted, 0);
        }
        ref other => panic!("expected timeout, got {other:?}"),
    }
    assert!(report.elapsed < Duration::from_secs(1), "{:?}", report.elapsed);
    assert_eq!(report.attempted, 0);
    assert_eq!(store.create_calls(), 0);
    assert_eq!(store.upsert_count(), 0);
}

#[tokio::test]
async fn missing_root_is_a_discovery_error() {
    let fixture = ContainerFixture::new();
    let store = Arc::new(RecordingStore::new());
    let controller = BatchIngestionController::new(store.clone(), config(1)).unwrap();

    let report = controller
        .run_batch(&fixture.path().join("does-not-exist"))
        .await;
    assert!(matches!(report.error, Some(IngestError::Discovery { .. })));
    assert_eq!(store.info_calls(), 0);
}
