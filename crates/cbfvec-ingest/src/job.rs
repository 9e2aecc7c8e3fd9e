//! Per-file ingestion: read, decode, embed, upsert.

use std::path::{Path, PathBuf};

use cbfvec_embed::FeatureEmbedder;
use cbfvec_format::{decode_image, FormatError};
use cbfvec_store::{Payload, PayloadValue, VectorStore};
use uuid::Uuid;

use crate::error::{IngestError, IngestResult};

/// Payload `method` tag.
pub const METHOD: &str = "pixel";

/// Payload `engine` tag.
pub const ENGINE: &str = "cbfvec";

/// One file waiting to be processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionJob {
    /// File to ingest.
    pub path: PathBuf,
}

impl IngestionJob {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// A decoded and embedded file, ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedPoint {
    /// Embedding vector.
    pub vector: Vec<f32>,
    /// Metadata stored alongside the vector.
    pub payload: Payload,
}

/// Reads, decodes, and embeds a file. CPU bound; call off the async runtime.
pub fn prepare_point(path: &Path, embedder: &FeatureEmbedder) -> IngestResult<PreparedPoint> {
    let decode_err = |source: FormatError| IngestError::Decode {
        path: path.to_path_buf(),
        source,
    };

    let raw = std::fs::read(path).map_err(|e| decode_err(FormatError::Io(e)))?;
    let content_hash = blake3::hash(&raw).to_hex().to_string();
    let image = decode_image(&raw).map_err(decode_err)?;

    let vector = embedder
        .embed(&image.pixels, image.width, image.height)
        .map_err(|source| IngestError::Embed {
            path: path.to_path_buf(),
            source,
        })?;

    let payload = build_payload(path, image.width, image.height, content_hash);
    Ok(PreparedPoint { vector, payload })
}

fn build_payload(path: &Path, width: usize, height: usize, content_hash: String) -> Payload {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());

    let mut payload = Payload::new();
    payload.insert("filename".into(), PayloadValue::from(filename));
    payload.insert(
        "path".into(),
        PayloadValue::from(absolute.to_string_lossy().into_owned()),
    );
    payload.insert("width".into(), PayloadValue::Integer(width as i64));
    payload.insert("height".into(), PayloadValue::Integer(height as i64));
    payload.insert("method".into(), PayloadValue::from(METHOD));
    payload.insert("engine".into(), PayloadValue::from(ENGINE));
    payload.insert("content_hash".into(), PayloadValue::from(content_hash));
    payload
}

/// Runs one job to completion and returns the id of the stored point.
///
/// Decoding and embedding run on the blocking pool so that slow files do
/// not stall the runtime's worker threads.
pub async fn ingest_file(
    store: &dyn VectorStore,
    embedder: FeatureEmbedder,
    collection: &str,
    job: &IngestionJob,
) -> IngestResult<Uuid> {
    let path = job.path.clone();
    let prepared = run_blocking(&job.path, move || prepare_point(&path, &embedder)).await?;

    let id = Uuid::new_v4();
    store
        .upsert(collection, id, prepared.vector, prepared.payload)
        .await
        .map_err(|source| IngestError::UpsertFailed {
            path: job.path.clone(),
            source,
        })?;

    tracing::debug!(path = %job.path.display(), point = %id, "ingested");
    Ok(id)
}

/// Runs `work` on the blocking pool. A panic inside it is reported against
/// `path`.
async fn run_blocking<T, F>(path: &Path, work: F) -> IngestResult<T>
where
    F: FnOnce() -> IngestResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| IngestError::WorkerPanicked {
            path: Some(path.to_path_buf()),
            message: e.to_string(),
        })?
}
