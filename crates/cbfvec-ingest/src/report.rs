//! Batch outcome reporting.

use std::time::Duration;

use serde::Serialize;

use crate::error::{IngestError, IngestResult};

/// Outcome of one batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Files selected for ingestion.
    pub discovered: usize,
    /// Files left out by the extension filter.
    pub skipped: usize,
    /// Jobs a worker started.
    pub attempted: usize,
    /// Jobs that ended with a stored point.
    pub succeeded: usize,
    /// Jobs that failed.
    pub failed: usize,
    /// Wall time of the whole run.
    pub elapsed: Duration,
    /// First error observed, if any.
    pub error: Option<IngestError>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Jobs discovered but never started.
    pub fn not_attempted(&self) -> usize {
        self.discovered.saturating_sub(self.attempted)
    }

    /// Drops the counters and keeps the first error.
    pub fn into_result(self) -> IngestResult<()> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Serializable view for `--json` output.
    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            success: self.is_success(),
            discovered: self.discovered,
            skipped: self.skipped,
            attempted: self.attempted,
            succeeded: self.succeeded,
            failed: self.failed,
            elapsed_ms: self.elapsed.as_millis() as u64,
            error: self.error.as_ref().map(|e| ErrorSummary {
                code: e.code().to_string(),
                message: e.to_string(),
                path: e.path().map(|p| p.to_string_lossy().to_string()),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub success: bool,
    pub discovered: usize,
    pub skipped: usize,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorSummary {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}
