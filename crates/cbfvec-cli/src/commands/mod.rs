//! CLI command implementations

pub mod ingest;
pub mod inspect;
pub mod search;

use anyhow::{Context, Result};
use cbfvec_store::{QdrantConfig, QdrantStore};

/// Build the runtime batch commands run on.
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")
}

/// Connect to Qdrant, applying an optional URL override.
pub(crate) fn qdrant_store(config: &QdrantConfig, url: Option<&str>) -> Result<QdrantStore> {
    let mut config = config.clone();
    if let Some(url) = url {
        config.url = url.to_string();
    }
    QdrantStore::new(&config)
        .with_context(|| format!("Failed to configure Qdrant client for {}", config.url))
}
