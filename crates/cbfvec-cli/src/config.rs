//! Configuration file loading.
//!
//! ```yaml
//! qdrant:
//!   url: http://qdrant:6333
//!   api_key: secret
//! ingest:
//!   collection: beamline_7
//!   workers: 8
//! ```
//!
//! Every key is optional. Command-line flags override values from the file.

use std::path::Path;

use anyhow::{bail, Context, Result};
use cbfvec_ingest::IngestConfig;
use cbfvec_store::QdrantConfig;
use serde::{Deserialize, Serialize};

/// Top-level configuration file layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Qdrant connection settings.
    pub qdrant: QdrantConfig,
    /// Batch ingestion settings.
    pub ingest: IngestConfig,
}

impl AppConfig {
    /// Load from `path`, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            tracing::debug!("no config file given, using defaults");
            return Ok(Self::default());
        };

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::parse(path, &contents)?;
        tracing::info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Parse `contents`, choosing the format from the extension of `path`.
    pub fn parse(path: &Path, contents: &str) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        let config: Self = match ext.as_deref() {
            Some("yaml") | Some("yml") => serde_yaml::from_str(contents)
                .with_context(|| format!("Invalid YAML config: {}", path.display()))?,
            Some("json") => serde_json::from_str(contents)
                .with_context(|| format!("Invalid JSON config: {}", path.display()))?,
            _ => bail!(
                "Unsupported config format for {} (expected .yaml, .yml or .json)",
                path.display()
            ),
        };
        Ok(config)
    }
}
