//! In-process vector store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::payload::Payload;
use crate::{CollectionInfo, SearchHit, VectorStore};

#[derive(Debug, Clone)]
struct StoredPoint {
    id: Uuid,
    vector: Vec<f32>,
    payload: Payload,
}

#[derive(Debug, Default)]
struct Collection {
    dimension: usize,
    points: Vec<StoredPoint>,
    index: HashMap<Uuid, usize>,
}

/// Cosine-similarity store held in memory.
///
/// Ties in score keep insertion order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of points in a collection (0 if it does not exist).
    pub async fn point_count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map(|c| c.points.len())
            .unwrap_or(0)
    }

    /// Payloads of every point in a collection, in insertion order.
    pub async fn payloads(&self, collection: &str) -> Vec<Payload> {
        self.collections
            .read()
            .await
            .get(collection)
            .map(|c| c.points.iter().map(|p| p.payload.clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn collection_info(&self, name: &str) -> StoreResult<Option<CollectionInfo>> {
        Ok(self
            .collections
            .read()
            .await
            .get(name)
            .map(|c| CollectionInfo {
                dimension: c.dimension,
            }))
    }

    async fn create_collection(&self, name: &str, dimension: usize) -> StoreResult<()> {
        if dimension == 0 {
            return Err(StoreError::Config(
                "collection dimension must be > 0".to_string(),
            ));
        }
        self.collections
            .write()
            .await
            .entry(name.to_string())
            .or_insert_with(|| Collection {
                dimension,
                ..Default::default()
            });
        Ok(())
    }

    async fn upsert(
        &self,
        collection: &str,
        id: Uuid,
        vector: Vec<f32>,
        payload: Payload,
    ) -> StoreResult<()> {
        let mut guard = self.collections.write().await;
        let coll = guard
            .get_mut(collection)
            .ok_or_else(|| StoreError::CollectionNotFound {
                name: collection.to_string(),
            })?;

        if vector.len() != coll.dimension {
            return Err(StoreError::DimensionMismatch {
                collection: collection.to_string(),
                expected: coll.dimension,
                actual: vector.len(),
            });
        }

        let point = StoredPoint {
            id,
            vector,
            payload,
        };
        match coll.index.get(&id).copied() {
            Some(slot) => coll.points[slot] = point,
            None => {
                coll.index.insert(id, coll.points.len());
                coll.points.push(point);
            }
        }
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> StoreResult<Vec<SearchHit>> {
        let guard = self.collections.read().await;
        let coll = guard
            .get(collection)
            .ok_or_else(|| StoreError::CollectionNotFound {
                name: collection.to_string(),
            })?;

        if vector.len() != coll.dimension {
            return Err(StoreError::DimensionMismatch {
                collection: collection.to_string(),
                expected: coll.dimension,
                actual: vector.len(),
            });
        }

        let mut scored: Vec<(f32, &StoredPoint)> = coll
            .points
            .iter()
            .map(|p| (cosine_similarity(vector, &p.vector), p))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(score, p)| SearchHit {
                id: p.id.to_string(),
                score,
                payload: p.payload.clone(),
            })
            .collect())
    }
}

/// Cosine similarity; 0.0 when either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        dot += x as f64 * y as f64;
        norm_a += x as f64 * x as f64;
        norm_b += y as f64 * y as f64;
    }
    let denom = (norm_a * norm_b).sqrt();
    if denom > 0.0 {
        (dot / denom) as f32
    } else {
        0.0
    }
}
