//! Batch ingestion configuration.

use std::time::Duration;

use cbfvec_embed::DEFAULT_TARGET_SIZE;
use serde::{Deserialize, Serialize};

use crate::error::{IngestError, IngestResult};

/// Default destination collection.
pub const DEFAULT_COLLECTION: &str = "cbf_images";

/// Default number of parallel workers.
pub const DEFAULT_WORKERS: usize = 4;

/// Default file extension accepted when ingesting a directory.
pub const DEFAULT_EXTENSION: &str = "cbf";

/// Settings for one batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Destination collection.
    pub collection: String,
    /// Number of parallel workers.
    pub workers: usize,
    /// Embedding edge length; vectors have `target_size²` elements.
    pub target_size: usize,
    /// Extension (without dot) files in a directory must carry; `None` accepts all.
    pub extension: Option<String>,
    /// Time budget per round of `workers` files, in milliseconds.
    pub round_timeout_ms: u64,
    /// Fixed margin added to the batch deadline, in milliseconds.
    pub timeout_margin_ms: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION.to_string(),
            workers: DEFAULT_WORKERS,
            target_size: DEFAULT_TARGET_SIZE,
            extension: Some(DEFAULT_EXTENSION.to_string()),
            round_timeout_ms: 1_000,
            timeout_margin_ms: 5_000,
        }
    }
}

impl IngestConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> IngestResult<()> {
        if self.collection.trim().is_empty() {
            return Err(IngestError::InvalidConfig(
                "collection cannot be empty".to_string(),
            ));
        }
        if self.workers == 0 {
            return Err(IngestError::InvalidConfig("workers must be > 0".to_string()));
        }
        if self.target_size == 0 {
            return Err(IngestError::InvalidConfig(
                "target_size must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Length of the vectors this configuration produces.
    pub fn vector_dimension(&self) -> usize {
        self.target_size * self.target_size
    }

    /// Deadline for a batch of `jobs` files.
    ///
    /// `round_timeout * ceil(jobs / workers) + timeout_margin`.
    pub fn deadline_for(&self, jobs: usize) -> Duration {
        let workers = self.workers.max(1);
        let rounds = jobs.div_ceil(workers) as u64;
        Duration::from_millis(
            self.round_timeout_ms
                .saturating_mul(rounds)
                .saturating_add(self.timeout_margin_ms),
        )
    }
}
