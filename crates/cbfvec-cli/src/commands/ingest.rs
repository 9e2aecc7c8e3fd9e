//! Ingest command implementation
//!
//! Decodes, embeds, and stores a CBF file or a directory of them.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use cbfvec_ingest::{BatchIngestionController, BatchReport, IngestConfig};
use cbfvec_store::{MemoryStore, VectorStore};
use colored::Colorize;

use super::{qdrant_store, runtime};
use crate::config::AppConfig;

/// Command-line overrides for one ingest run.
#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    pub path: PathBuf,
    pub workers: Option<usize>,
    pub target_size: Option<usize>,
    pub collection: Option<String>,
    pub extension: Option<String>,
    pub all_files: bool,
    pub qdrant_url: Option<String>,
    pub dry_run: bool,
    pub json: bool,
}

impl IngestOptions {
    /// Merge these overrides into the file/default configuration.
    pub fn apply(&self, mut config: IngestConfig) -> IngestConfig {
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(size) = self.target_size {
            config.target_size = size;
        }
        if let Some(collection) = &self.collection {
            config.collection = collection.clone();
        }
        if self.all_files {
            config.extension = None;
        } else if let Some(ext) = &self.extension {
            config.extension = Some(ext.clone());
        }
        config
    }
}

/// Run the ingest command
///
/// # Returns
/// Exit code: 0 when every file was stored, 1 otherwise
pub fn run(app: &AppConfig, opts: &IngestOptions) -> Result<ExitCode> {
    let config = opts.apply(app.ingest.clone());

    let store: Arc<dyn VectorStore> = if opts.dry_run {
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(qdrant_store(&app.qdrant, opts.qdrant_url.as_deref())?)
    };

    let controller =
        BatchIngestionController::new(store, config).context("Invalid ingest configuration")?;

    if !opts.json {
        println!(
            "{} {} {} {}",
            "Ingesting".cyan().bold(),
            opts.path.display(),
            "->".dimmed(),
            controller.config().collection
        );
        if opts.dry_run {
            println!("  {}", "dry run: vectors are kept in memory only".yellow());
        }
    }

    let rt = runtime()?;
    let report = rt.block_on(controller.run_batch(&opts.path));

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&report.summary())?);
    } else {
        print_summary(&report);
    }

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

fn print_summary(report: &BatchReport) {
    println!("\n{}", "=".repeat(60));
    println!(
        "{} {} {}",
        "Ingest Summary".bold(),
        "•".dimmed(),
        format!("{:.1}s", report.elapsed.as_secs_f64()).dimmed()
    );
    println!("  Discovered: {}", report.discovered);
    println!(
        "  Stored:     {}",
        if report.failed == 0 {
            report.succeeded.to_string().green()
        } else {
            report.succeeded.to_string().normal()
        }
    );
    println!(
        "  Failed:     {}",
        if report.failed > 0 {
            report.failed.to_string().red()
        } else {
            report.failed.to_string().normal()
        }
    );
    if report.not_attempted() > 0 {
        println!(
            "  Cancelled:  {}",
            report.not_attempted().to_string().yellow()
        );
    }
    if report.skipped > 0 {
        println!("  Skipped:    {}", report.skipped.to_string().dimmed());
    }

    match &report.error {
        None => println!("{}", "✓ batch complete".green().bold()),
        Some(err) => println!("{} [{}] {}", "✗ FAIL".red().bold(), err.code(), err),
    }
}
