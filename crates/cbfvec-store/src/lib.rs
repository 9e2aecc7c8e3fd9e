//! cbfvec vector store interface
//!
//! The ingestion pipeline talks to its similarity store only through
//! [`VectorStore`]. Two implementations ship with the crate:
//!
//! - [`MemoryStore`]: process-local, cosine similarity; used by tests and dry runs
//! - [`QdrantStore`]: Qdrant over its REST API
//!
//! Implementations must be safe to share across worker tasks.

pub mod error;
pub mod memory;
pub mod payload;
pub mod qdrant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use payload::{payload_from_json, Payload, PayloadValue};
pub use qdrant::{Distance, QdrantConfig, QdrantStore};

/// A search result, nearest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Point identifier.
    pub id: String,
    /// Similarity score (higher is closer).
    pub score: f32,
    /// Stored payload.
    pub payload: Payload,
}

/// Existing collection metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionInfo {
    /// Vector dimension the collection was created with.
    pub dimension: usize,
}

/// Similarity store used by the ingestion pipeline.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Look up a collection; `Ok(None)` if it does not exist.
    async fn collection_info(&self, name: &str) -> StoreResult<Option<CollectionInfo>>;

    /// Create a collection for `dimension`-length vectors.
    async fn create_collection(&self, name: &str, dimension: usize) -> StoreResult<()>;

    /// Insert or replace a single point.
    async fn upsert(
        &self,
        collection: &str,
        id: Uuid,
        vector: Vec<f32>,
        payload: Payload,
    ) -> StoreResult<()>;

    /// Return up to `limit` points nearest to `vector`.
    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> StoreResult<Vec<SearchHit>>;

    /// Make sure `name` exists with the given dimension.
    ///
    /// Checks for the collection first and only creates it when missing. An
    /// existing collection with a different dimension is an error.
    async fn ensure_collection(&self, name: &str, dimension: usize) -> StoreResult<()> {
        match self.collection_info(name).await? {
            Some(info) if info.dimension == dimension => Ok(()),
            Some(info) => Err(StoreError::DimensionMismatch {
                collection: name.to_string(),
                expected: info.dimension,
                actual: dimension,
            }),
            None => {
                tracing::info!(collection = name, dimension, "creating collection");
                self.create_collection(name, dimension).await
            }
        }
    }
}
