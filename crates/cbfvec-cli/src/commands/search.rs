//! Search command implementation
//!
//! Embeds a query image and lists the nearest stored images.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use cbfvec_embed::FeatureEmbedder;
use cbfvec_ingest::prepare_point;
use cbfvec_store::{SearchHit, VectorStore};
use colored::Colorize;

use super::{qdrant_store, runtime};
use crate::config::AppConfig;

/// Run the search command
///
/// # Arguments
/// * `query` - CBF file to use as the query
/// * `limit` - Maximum number of hits
/// * `collection` - Collection override
/// * `qdrant_url` - Qdrant URL override
/// * `json_output` - Whether to output machine-readable JSON
pub fn run(
    app: &AppConfig,
    query: &Path,
    limit: usize,
    collection: Option<&str>,
    qdrant_url: Option<&str>,
    json_output: bool,
) -> Result<ExitCode> {
    let collection = collection.unwrap_or(app.ingest.collection.as_str());
    let embedder = FeatureEmbedder::new(app.ingest.target_size)
        .context("Invalid target size in configuration")?;
    let point = prepare_point(query, &embedder)
        .with_context(|| format!("Failed to embed query: {}", query.display()))?;

    let store = qdrant_store(&app.qdrant, qdrant_url)?;
    let rt = runtime()?;
    let hits = rt
        .block_on(store.search(collection, &point.vector, limit))
        .with_context(|| format!("Search in collection '{}' failed", collection))?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&hits)?);
    } else {
        print_hits(query, collection, &hits);
    }
    Ok(ExitCode::SUCCESS)
}

fn print_hits(query: &Path, collection: &str, hits: &[SearchHit]) {
    println!(
        "{} {} {} {}",
        "Nearest to".cyan().bold(),
        query.display(),
        "in".dimmed(),
        collection
    );
    if hits.is_empty() {
        println!("  {}", "no matches".dimmed());
        return;
    }
    for (rank, hit) in hits.iter().enumerate() {
        let name = hit
            .payload
            .get("filename")
            .and_then(|v| v.as_str())
            .unwrap_or(hit.id.as_str());
        let path = hit
            .payload
            .get("path")
            .and_then(|v| v.as_str())
            .unwrap_or("");
        println!(
            "  {} {:.4} {} {}",
            format!("{:>2}.", rank + 1).bold(),
            hit.score,
            name,
            path.dimmed()
        );
    }
}
