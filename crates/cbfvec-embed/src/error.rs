//! Error types for embedding.

use thiserror::Error;

/// Result type for embedding operations.
pub type EmbedResult<T> = Result<T, EmbedError>;

/// Errors that can occur while embedding a pixel grid.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EmbedError {
    /// Target resolution of zero.
    #[error("target size must be greater than zero")]
    ZeroTargetSize,

    /// Source image has a zero dimension.
    #[error("cannot embed an empty {width}x{height} image")]
    EmptyImage {
        /// Source width.
        width: usize,
        /// Source height.
        height: usize,
    },

    /// Pixel slice length does not match the stated dimensions.
    #[error("pixel grid has {len} elements, expected {width}x{height}")]
    GridSizeMismatch {
        /// Actual number of pixels.
        len: usize,
        /// Stated width.
        width: usize,
        /// Stated height.
        height: usize,
    },
}

impl EmbedError {
    /// Returns a stable error code for reporting.
    pub fn code(&self) -> &'static str {
        match self {
            EmbedError::ZeroTargetSize => "EMBED_001",
            EmbedError::EmptyImage { .. } => "EMBED_002",
            EmbedError::GridSizeMismatch { .. } => "EMBED_003",
        }
    }
}
