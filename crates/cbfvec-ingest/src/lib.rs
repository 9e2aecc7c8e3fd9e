//! cbfvec batch ingestion
//!
//! Turns a file or a directory of CBF images into points in a
//! [`VectorStore`](cbfvec_store::VectorStore). Each file is decoded, embedded,
//! and upserted by one of a bounded pool of workers. The first failure
//! cancels the rest of the batch and is returned to the caller with the path
//! of the file that caused it.
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use cbfvec_ingest::{BatchIngestionController, IngestConfig};
//! use cbfvec_store::MemoryStore;
//!
//! # async fn demo() {
//! let controller =
//!     BatchIngestionController::new(Arc::new(MemoryStore::new()), IngestConfig::default())
//!         .unwrap();
//! let report = controller.run_batch(Path::new("/data/frames")).await;
//! println!("{} of {} stored", report.succeeded, report.discovered);
//! # }
//! ```

pub mod cancel;
pub mod config;
pub mod controller;
pub mod discover;
pub mod error;
pub mod job;
pub mod report;

pub use cancel::CancelSignal;
pub use config::{IngestConfig, DEFAULT_COLLECTION, DEFAULT_EXTENSION, DEFAULT_WORKERS};
pub use controller::{run_batch, BatchIngestionController, BatchPhase};
pub use discover::{discover_files, matches_extension, Discovery};
pub use error::{IngestError, IngestResult};
pub use job::{ingest_file, prepare_point, IngestionJob, PreparedPoint, ENGINE, METHOD};
pub use report::{BatchReport, BatchSummary, ErrorSummary};
