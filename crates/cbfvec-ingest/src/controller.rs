//! Batch ingestion controller.
//!
//! A run moves through `Discovering -> Provisioning -> Dispatching ->
//! Draining -> Done`. Provisioning failures abort before any job is queued.
//! During dispatch a fixed pool of workers pulls jobs from a shared bounded
//! queue; the first failing job records its error and cancels the batch, so
//! no further jobs start while in-flight ones finish. The whole run is
//! bounded by [`IngestConfig::deadline_for`].

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use cbfvec_embed::FeatureEmbedder;
use cbfvec_store::VectorStore;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinSet;

use crate::cancel::CancelSignal;
use crate::config::IngestConfig;
use crate::discover::discover_files;
use crate::error::{IngestError, IngestResult};
use crate::job::{ingest_file, IngestionJob};
use crate::report::BatchReport;

/// Stand-in deadline when the configured budget overflows the clock.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Phase of a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPhase {
    /// Listing the input path.
    Discovering,
    /// Checking or creating the destination collection.
    Provisioning,
    /// Starting workers and queueing jobs.
    Dispatching,
    /// Waiting for in-flight jobs to finish.
    Draining,
    /// The run has ended, successfully or not.
    Done,
}

impl fmt::Display for BatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BatchPhase::Discovering => "discovering",
            BatchPhase::Provisioning => "provisioning",
            BatchPhase::Dispatching => "dispatching",
            BatchPhase::Draining => "draining",
            BatchPhase::Done => "done",
        };
        f.write_str(name)
    }
}

/// State shared by the dispatcher and every worker of one run.
struct BatchShared {
    store: Arc<dyn VectorStore>,
    embedder: FeatureEmbedder,
    collection: String,
    cancel: CancelSignal,
    first_error: Mutex<Option<IngestError>>,
    attempted: AtomicUsize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
}

impl BatchShared {
    /// Stores `err` if no error has been recorded yet. Later errors are
    /// logged, never discarded silently.
    fn record_error(&self, err: IngestError) -> bool {
        let mut slot = self.first_error.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            tracing::error!(code = err.code(), "{}", err);
            *slot = Some(err);
            true
        } else {
            tracing::warn!(code = err.code(), "additional failure: {}", err);
            false
        }
    }

    fn record_failure(&self, err: IngestError) {
        self.failed.fetch_add(1, Ordering::SeqCst);
        self.record_error(err);
        if self.cancel.cancel() {
            tracing::warn!("cancelling batch after first failure");
        }
    }

    fn take_error(&self) -> Option<IngestError> {
        self.first_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

/// Runs batches of files through decode, embed, and upsert.
pub struct BatchIngestionController {
    store: Arc<dyn VectorStore>,
    config: IngestConfig,
    embedder: FeatureEmbedder,
}

impl fmt::Debug for BatchIngestionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchIngestionController")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl BatchIngestionController {
    /// Creates a controller after validating `config`.
    pub fn new(store: Arc<dyn VectorStore>, config: IngestConfig) -> IngestResult<Self> {
        config.validate()?;
        let embedder = FeatureEmbedder::new(config.target_size)
            .map_err(|e| IngestError::InvalidConfig(e.to_string()))?;
        Ok(Self {
            store,
            config,
            embedder,
        })
    }

    /// The validated configuration this controller runs with.
    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Ingests the file or directory at `root`.
    ///
    /// Never panics on bad input; every failure ends up in
    /// [`BatchReport::error`].
    pub async fn run_batch(&self, root: &Path) -> BatchReport {
        let started = Instant::now();
        let mut report = self.run_phases(root).await;
        report.elapsed = started.elapsed();
        enter(BatchPhase::Done);
        tracing::info!(
            discovered = report.discovered,
            attempted = report.attempted,
            succeeded = report.succeeded,
            failed = report.failed,
            skipped = report.skipped,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "batch finished"
        );
        report
    }

    async fn run_phases(&self, root: &Path) -> BatchReport {
        enter(BatchPhase::Discovering);
        let discovery = match discover_files(root, self.config.extension.as_deref()) {
            Ok(discovery) => discovery,
            Err(err) => {
                tracing::error!(code = err.code(), "{}", err);
                return BatchReport {
                    error: Some(err),
                    ..Default::default()
                };
            }
        };
        for path in &discovery.skipped {
            tracing::debug!(path = %path.display(), "skipped by extension filter");
        }

        let mut report = BatchReport {
            discovered: discovery.files.len(),
            skipped: discovery.skipped.len(),
            ..Default::default()
        };

        // One budget covers provisioning and the job drain.
        let budget = self.config.deadline_for(discovery.files.len());
        let now = tokio::time::Instant::now();
        let deadline = now.checked_add(budget).unwrap_or(now + FAR_FUTURE);

        enter(BatchPhase::Provisioning);
        let collection = &self.config.collection;
        let provisioned = tokio::time::timeout_at(
            deadline,
            self.store
                .ensure_collection(collection, self.config.vector_dimension()),
        )
        .await;
        let failure = match provisioned {
            Ok(Ok(())) => None,
            Ok(Err(source)) => Some(IngestError::CollectionProvisionFailed {
                collection: collection.clone(),
                source,
            }),
            Err(_) => Some(IngestError::BatchTimeout {
                timeout: budget,
                attempted: 0,
            }),
        };
        if let Some(err) = failure {
            tracing::error!(code = err.code(), "{}", err);
            report.error = Some(err);
            return report;
        }

        if discovery.files.is_empty() {
            tracing::info!(root = %root.display(), "no files to ingest");
            return report;
        }

        let jobs: Vec<IngestionJob> = discovery.files.into_iter().map(IngestionJob::new).collect();
        let shared = self.dispatch(jobs, budget, deadline).await;

        report.attempted = shared.attempted.load(Ordering::SeqCst);
        report.succeeded = shared.succeeded.load(Ordering::SeqCst);
        report.failed = shared.failed.load(Ordering::SeqCst);
        report.error = shared.take_error();
        report
    }

    async fn dispatch(
        &self,
        jobs: Vec<IngestionJob>,
        budget: Duration,
        deadline: tokio::time::Instant,
    ) -> Arc<BatchShared> {
        enter(BatchPhase::Dispatching);
        let job_count = jobs.len();
        let workers = self.config.workers.min(job_count).max(1);
        tracing::info!(
            files = job_count,
            workers,
            collection = %self.config.collection,
            deadline_ms = budget.as_millis() as u64,
            "starting batch"
        );

        let shared = Arc::new(BatchShared {
            store: Arc::clone(&self.store),
            embedder: self.embedder,
            collection: self.config.collection.clone(),
            cancel: CancelSignal::new(),
            first_error: Mutex::new(None),
            attempted: AtomicUsize::new(0),
            succeeded: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        });

        let (tx, rx) = mpsc::channel(workers);
        let queue = Arc::new(AsyncMutex::new(rx));
        let mut pool = JoinSet::new();
        for worker_id in 0..workers {
            pool.spawn(worker_loop(
                worker_id,
                Arc::clone(&queue),
                Arc::clone(&shared),
            ));
        }
        // Workers own the receiver from here on; if they all exit the
        // dispatcher's sends fail instead of blocking.
        drop(queue);

        let dispatcher = tokio::spawn(dispatch_jobs(jobs, tx, shared.cancel.clone()));

        enter(BatchPhase::Draining);
        if tokio::time::timeout_at(deadline, drain(&mut pool, &shared))
            .await
            .is_err()
        {
            let attempted = shared.attempted.load(Ordering::SeqCst);
            shared.record_error(IngestError::BatchTimeout {
                timeout: budget,
                attempted,
            });
            shared.cancel.cancel();
            drain(&mut pool, &shared).await;
        }

        match dispatcher.await {
            Ok(sent) => tracing::debug!(sent, total = job_count, "dispatcher finished"),
            Err(e) => {
                shared.record_error(IngestError::WorkerPanicked {
                    path: None,
                    message: format!("dispatcher: {}", e),
                });
            }
        }

        shared
    }
}

fn enter(phase: BatchPhase) {
    tracing::debug!(phase = %phase, "batch phase");
}

/// Feeds jobs into the queue until done or cancelled, then closes it.
async fn dispatch_jobs(
    jobs: Vec<IngestionJob>,
    tx: mpsc::Sender<IngestionJob>,
    cancel: CancelSignal,
) -> usize {
    let mut sent = 0;
    for job in jobs {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            res = tx.send(job) => {
                if res.is_err() {
                    break;
                }
                sent += 1;
            }
        }
    }
    sent
}

async fn worker_loop(
    worker_id: usize,
    queue: Arc<AsyncMutex<mpsc::Receiver<IngestionJob>>>,
    shared: Arc<BatchShared>,
) {
    loop {
        if shared.cancel.is_cancelled() {
            break;
        }
        let next = {
            let mut rx = queue.lock().await;
            rx.recv().await
        };
        let Some(job) = next else {
            break;
        };
        // A job received after cancellation is dropped without starting.
        if shared.cancel.is_cancelled() {
            break;
        }

        shared.attempted.fetch_add(1, Ordering::SeqCst);
        match ingest_file(shared.store.as_ref(), shared.embedder, &shared.collection, &job).await {
            Ok(_) => {
                shared.succeeded.fetch_add(1, Ordering::SeqCst);
            }
            Err(err) => {
                shared.record_failure(err);
                break;
            }
        }
    }
    tracing::trace!(worker_id, "worker exiting");
}

async fn drain(pool: &mut JoinSet<()>, shared: &BatchShared) {
    while let Some(joined) = pool.join_next().await {
        if let Err(e) = joined {
            shared.record_error(IngestError::WorkerPanicked {
                path: None,
                message: e.to_string(),
            });
            shared.cancel.cancel();
        }
    }
}

/// Ingests `root` into `store` with default settings apart from the worker
/// count and embedding size. Returns the first error, if any.
pub async fn run_batch(
    store: Arc<dyn VectorStore>,
    root: &Path,
    workers: usize,
    target_size: usize,
) -> IngestResult<()> {
    let config = IngestConfig {
        workers,
        target_size,
        ..Default::default()
    };
    BatchIngestionController::new(store, config)?
        .run_batch(root)
        .await
        .into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbfvec_format::ContainerWriter;
    use cbfvec_store::{MemoryStore, StoreError};
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_frames(dir: &Path, count: usize) -> Vec<PathBuf> {
        (0..count)
            .map(|i| {
                let path = dir.join(format!("frame_{:03}.cbf", i));
                let pixels: Vec<i32> = (0..16).map(|p| (p * (i as i32 + 1)) % 300).collect();
                ContainerWriter::new(4, 4).write_file(&path, &pixels).unwrap();
                path
            })
            .collect()
    }

    fn config(workers: usize) -> IngestConfig {
        IngestConfig {
            collection: "test".to_string(),
            workers,
            target_size: 4,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_directory_batch_stores_every_file() {
        let tmp = TempDir::new().unwrap();
        write_frames(tmp.path(), 5);
        let store = Arc::new(MemoryStore::new());

        let controller = BatchIngestionController::new(store.clone(), config(2)).unwrap();
        let report = controller.run_batch(tmp.path()).await;

        assert!(report.is_success(), "{:?}", report.error);
        assert_eq!(report.discovered, 5);
        assert_eq!(report.attempted, 5);
        assert_eq!(report.succeeded, 5);
        assert_eq!(store.point_count("test").await, 5);
    }

    #[tokio::test]
    async fn test_single_file_batch() {
        let tmp = TempDir::new().unwrap();
        let files = write_frames(tmp.path(), 3);
        let store = Arc::new(MemoryStore::new());

        let controller = BatchIngestionController::new(store.clone(), config(4)).unwrap();
        let report = controller.run_batch(&files[1]).await;

        assert!(report.is_success());
        assert_eq!(report.succeeded, 1);
        assert_eq!(store.point_count("test").await, 1);
    }

    #[tokio::test]
    async fn test_corrupt_file_fails_batch_with_its_path() {
        let tmp = TempDir::new().unwrap();
        write_frames(tmp.path(), 2);
        let bad = tmp.path().join("frame_bad.cbf");
        std::fs::write(&bad, b"no marker here").unwrap();
        let store = Arc::new(MemoryStore::new());

        let controller = BatchIngestionController::new(store, config(1)).unwrap();
        let report = controller.run_batch(tmp.path()).await;

        assert_eq!(report.failed, 1);
        let err = report.error.expect("batch should fail");
        assert_eq!(err.path(), Some(bad.as_path()));
    }

    #[tokio::test]
    async fn test_dimension_conflict_aborts_before_dispatch() {
        let tmp = TempDir::new().unwrap();
        write_frames(tmp.path(), 2);
        let store = Arc::new(MemoryStore::new());
        store.ensure_collection("test", 9).await.unwrap();

        let controller = BatchIngestionController::new(store.clone(), config(2)).unwrap();
        let report = controller.run_batch(tmp.path()).await;

        assert_eq!(report.attempted, 0);
        assert!(matches!(
            report.error,
            Some(IngestError::CollectionProvisionFailed {
                source: StoreError::DimensionMismatch { .. },
                ..
            })
        ));
        assert_eq!(store.point_count("test").await, 0);
    }

    #[tokio::test]
    async fn test_empty_directory_provisions_and_succeeds() {
        let tmp = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::new());

        let controller = BatchIngestionController::new(store.clone(), config(2)).unwrap();
        let report = controller.run_batch(tmp.path()).await;

        assert!(report.is_success());
        assert_eq!(report.discovered, 0);
        assert!(store.collection_info("test").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_run_batch_helper() {
        let tmp = TempDir::new().unwrap();
        write_frames(tmp.path(), 3);
        let store = Arc::new(MemoryStore::new());

        run_batch(store.clone(), tmp.path(), 3, 4).await.unwrap();
        assert_eq!(store.point_count("cbf_images").await, 3);
    }

    #[test]
    fn test_phase_names_and_config_accessor() {
        let names: Vec<String> = [
            BatchPhase::Discovering,
            BatchPhase::Provisioning,
            BatchPhase::Dispatching,
            BatchPhase::Draining,
            BatchPhase::Done,
        ]
        .iter()
        .map(ToString::to_string)
        .collect();
        assert_eq!(
            names,
            vec!["discovering", "provisioning", "dispatching", "draining", "done"]
        );

        let controller =
            BatchIngestionController::new(Arc::new(MemoryStore::new()), config(3)).unwrap();
        assert_eq!(controller.config(), &config(3));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = BatchIngestionController::new(Arc::new(MemoryStore::new()), config(0)).unwrap_err();
        assert!(matches!(err, IngestError::InvalidConfig(_)));
    }
}
