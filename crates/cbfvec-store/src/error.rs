//! Error types for vector store operations.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors returned by [`crate::VectorStore`] implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A payload value has a type the store cannot hold.
    #[error("unsupported payload type for key '{key}': {kind}")]
    UnsupportedPayload {
        /// Payload key.
        key: String,
        /// Name of the rejected JSON type.
        kind: &'static str,
    },

    /// Vector or collection dimension disagrees.
    #[error("collection '{collection}' expects {expected}-dimensional vectors, got {actual}")]
    DimensionMismatch {
        /// Collection name.
        collection: String,
        /// Dimension the collection was created with.
        expected: usize,
        /// Dimension supplied by the caller.
        actual: usize,
    },

    /// The collection does not exist.
    #[error("collection not found: {name}")]
    CollectionNotFound {
        /// Collection name.
        name: String,
    },

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("store API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// JSON encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid client configuration.
    #[error("invalid store configuration: {0}")]
    Config(String),
}

impl StoreError {
    /// Returns a stable error code for reporting.
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::UnsupportedPayload { .. } => "STORE_001",
            StoreError::DimensionMismatch { .. } => "STORE_002",
            StoreError::CollectionNotFound { .. } => "STORE_003",
            StoreError::Http(_) => "STORE_004",
            StoreError::Api { .. } => "STORE_005",
            StoreError::Serialization(_) => "STORE_006",
            StoreError::Config(_) => "STORE_007",
        }
    }
}
