//! cbfvec CLI - ingest CBF diffraction images into a vector store
//!
//! This binary decodes byte-offset compressed CBF files, turns them into
//! fixed-length embeddings, and stores or searches them in Qdrant.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use cbfvec_cli::commands;
use cbfvec_cli::config::AppConfig;
use cbfvec_cli::logging;

/// cbfvec - CBF image similarity indexing
#[derive(Parser)]
#[command(name = "cbfvec")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (.yaml, .yml or .json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode, embed, and store a CBF file or every CBF file in a directory
    Ingest {
        /// File or directory to ingest (directories are not recursed)
        #[arg(short, long)]
        path: PathBuf,

        /// Number of parallel workers
        #[arg(short, long)]
        workers: Option<usize>,

        /// Embedding edge length (vectors have size^2 elements)
        #[arg(long)]
        target_size: Option<usize>,

        /// Destination collection
        #[arg(short, long)]
        collection: Option<String>,

        /// Only ingest directory entries with this extension
        #[arg(long, conflicts_with = "all_files")]
        extension: Option<String>,

        /// Ingest every regular file in the directory regardless of extension
        #[arg(long)]
        all_files: bool,

        /// Qdrant REST URL (overrides the config file)
        #[arg(long)]
        qdrant_url: Option<String>,

        /// Keep vectors in memory instead of writing to Qdrant
        #[arg(long)]
        dry_run: bool,

        /// Output machine-readable JSON summary (no colored output)
        #[arg(long)]
        json: bool,
    },

    /// Find the stored images most similar to a query file
    Search {
        /// CBF file to use as the query
        #[arg(short, long)]
        query: PathBuf,

        /// Maximum number of results
        #[arg(short, long, default_value_t = 5)]
        limit: usize,

        /// Collection to search
        #[arg(short, long)]
        collection: Option<String>,

        /// Qdrant REST URL (overrides the config file)
        #[arg(long)]
        qdrant_url: Option<String>,

        /// Output machine-readable JSON (no colored output)
        #[arg(long)]
        json: bool,
    },

    /// Print header fields and intensity statistics of a CBF file
    Inspect {
        /// Path to the CBF file
        #[arg(short, long)]
        input: PathBuf,

        /// Output machine-readable JSON (no colored output)
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result = AppConfig::load(cli.config.as_deref()).and_then(|app| match cli.command {
        Commands::Ingest {
            path,
            workers,
            target_size,
            collection,
            extension,
            all_files,
            qdrant_url,
            dry_run,
            json,
        } => commands::ingest::run(
            &app,
            &commands::ingest::IngestOptions {
                path,
                workers,
                target_size,
                collection,
                extension,
                all_files,
                qdrant_url,
                dry_run,
                json,
            },
        ),
        Commands::Search {
            query,
            limit,
            collection,
            qdrant_url,
            json,
        } => commands::search::run(
            &app,
            &query,
            limit,
            collection.as_deref(),
            qdrant_url.as_deref(),
            json,
        ),
        Commands::Inspect { input, json } => commands::inspect::run(&input, json),
    });

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", colored::Colorize::red("error"), e);
            ExitCode::from(1)
        }
    }
}
