//! Error types for batch ingestion.

use std::path::PathBuf;
use std::time::Duration;

use cbfvec_embed::EmbedError;
use cbfvec_format::FormatError;
use cbfvec_store::StoreError;
use thiserror::Error;

/// Result type for ingestion operations.
pub type IngestResult<T> = Result<T, IngestError>;

/// Errors that end a single job or a whole batch.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The input path could not be listed.
    #[error("failed to read {path}: {message}")]
    Discovery {
        /// Path being listed.
        path: PathBuf,
        /// Underlying error.
        message: String,
    },

    /// The destination collection could not be checked or created.
    #[error("failed to provision collection '{collection}': {source}")]
    CollectionProvisionFailed {
        /// Collection name.
        collection: String,
        /// Store error.
        #[source]
        source: StoreError,
    },

    /// A file could not be read or decoded.
    #[error("file {path}: {source}")]
    Decode {
        /// Offending file.
        path: PathBuf,
        /// Decoder error.
        #[source]
        source: FormatError,
    },

    /// A decoded image could not be embedded.
    #[error("file {path}: {source}")]
    Embed {
        /// Offending file.
        path: PathBuf,
        /// Embedder error.
        #[source]
        source: EmbedError,
    },

    /// The store rejected a point.
    #[error("file {path}: upsert failed: {source}")]
    UpsertFailed {
        /// Offending file.
        path: PathBuf,
        /// Store error.
        #[source]
        source: StoreError,
    },

    /// The batch deadline expired.
    #[error("batch timed out after {timeout:?} ({attempted} files attempted)")]
    BatchTimeout {
        /// Deadline that was exceeded.
        timeout: Duration,
        /// Jobs started before the deadline.
        attempted: usize,
    },

    /// A worker task panicked or was aborted.
    #[error("worker task failed: {message}")]
    WorkerPanicked {
        /// File being processed, when the panic happened inside a job.
        path: Option<PathBuf>,
        /// Join error description.
        message: String,
    },

    /// Invalid ingestion configuration.
    #[error("invalid ingest configuration: {0}")]
    InvalidConfig(String),
}

impl IngestError {
    /// Returns a stable error code for reporting.
    pub fn code(&self) -> &'static str {
        match self {
            IngestError::Discovery { .. } => "INGEST_001",
            IngestError::CollectionProvisionFailed { .. } => "INGEST_002",
            IngestError::Decode { .. } => "INGEST_003",
            IngestError::Embed { .. } => "INGEST_004",
            IngestError::UpsertFailed { .. } => "INGEST_005",
            IngestError::BatchTimeout { .. } => "INGEST_006",
            IngestError::WorkerPanicked { .. } => "INGEST_007",
            IngestError::InvalidConfig(_) => "INGEST_008",
        }
    }

    /// The file a per-file error refers to.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            IngestError::Decode { path, .. }
            | IngestError::Embed { path, .. }
            | IngestError::UpsertFailed { path, .. }
            | IngestError::Discovery { path, .. } => Some(path),
            IngestError::WorkerPanicked { path, .. } => path.as_deref(),
            _ => None,
        }
    }

    /// Whether this error concerns the batch as a whole rather than one file.
    pub fn is_batch_level(&self) -> bool {
        matches!(
            self,
            IngestError::CollectionProvisionFailed { .. }
                | IngestError::BatchTimeout { .. }
                | IngestError::WorkerPanicked { path: None, .. }
                | IngestError::InvalidConfig(_)
                | IngestError::Discovery { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_file_error_names_path() {
        let err = IngestError::Decode {
            path: PathBuf::from("/data/bad.cbf"),
            source: FormatError::MarkerNotFound,
        };
        assert!(err.to_string().contains("/data/bad.cbf"));
        assert_eq!(err.path(), Some(std::path::Path::new("/data/bad.cbf")));
        assert!(!err.is_batch_level());
    }

    #[test]
    fn test_timeout_is_batch_level() {
        let err = IngestError::BatchTimeout {
            timeout: Duration::from_secs(6),
            attempted: 3,
        };
        assert!(err.is_batch_level());
        assert_eq!(err.path(), None);
        assert_eq!(err.code(), "INGEST_006");
    }

    #[test]
    fn test_panic_inside_job_names_path() {
        let err = IngestError::WorkerPanicked {
            path: Some(PathBuf::from("/data/odd.cbf")),
            message: "task panicked".to_string(),
        };
        assert_eq!(err.path(), Some(std::path::Path::new("/data/odd.cbf")));
        assert!(!err.is_batch_level());

        let pool_failure = IngestError::WorkerPanicked {
            path: None,
            message: "task panicked".to_string(),
        };
        assert_eq!(pool_failure.path(), None);
        assert!(pool_failure.is_batch_level());
    }
}
