//! # newsrag CLI
//!
//! The `newsrag` binary drives the service: database initialization,
//! batch ingestion, one-shot PDF uploads and questions, and the HTTP
//! server.
//!
//! ## Usage
//!
//! ```bash
//! newsrag --config ./config/newsrag.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `newsrag init` | Create the SQLite database and run schema migrations |
//! | `newsrag ingest` | Chunk, embed, and index every record not yet embedded |
//! | `newsrag upload <file.pdf>` | Ingest a single PDF from disk |
//! | `newsrag ask "<question>"` | Answer a question from the indexed chunks |
//! | `newsrag serve` | Start the HTTP API server |
//!
//! API credentials come from the environment: `VECTOR_INDEX_API_KEY`,
//! `EMBEDDINGS_API_KEY`, and `GENERATION_API_KEY`.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use newsrag::config;
use newsrag::context::AppContext;
use newsrag::extract;
use newsrag::migrate;
use newsrag::pipeline::{content_hash, draft_from_pdf, UploadError, UploadOutcome};
use newsrag::server;

/// newsrag — retrieval-augmented question answering over news archives
/// and uploaded PDFs.
#[derive(Parser)]
#[command(
    name = "newsrag",
    about = "Retrieval-augmented question answering for news archives and uploaded PDFs",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/newsrag.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the record store schema.
    ///
    /// Creates the SQLite database file and the records table. Idempotent.
    Init,

    /// Process every record not yet embedded.
    ///
    /// Scans the record store and, for each record with
    /// `embeddings_generated = false`, chunks it, upserts the chunks into
    /// the vector index, and flips the flag. Individual failures are
    /// logged and skipped.
    Ingest,

    /// Ingest a single PDF from disk.
    ///
    /// Deduplicates by content hash; a byte-identical re-upload reports
    /// the existing record instead of creating a new one.
    Upload {
        /// Path to the PDF file.
        path: PathBuf,
    },

    /// Answer a question from the indexed chunks.
    Ask {
        /// The question to answer.
        question: String,
    },

    /// Start the HTTP API server.
    ///
    /// Exposes `POST /ask`, `POST /upload_pdf`, and `GET /health` on the
    /// configured bind address.
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("newsrag=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&config).await?;
            println!("record store initialized at {}", config.store.path.display());
        }

        Commands::Ingest => {
            let ctx = AppContext::initialize(&config).await?;
            let summary = ctx.pipeline.ingest_pending().await?;
            println!("ingest");
            println!("  records: {}", summary.total);
            println!("  embedded: {}", summary.embedded);
            println!("  already embedded: {}", summary.already_embedded);
            println!("  failed: {}", summary.failed.len());
            for (id, error) in &summary.failed {
                eprintln!("  {} failed: {}", id, error);
            }
        }

        Commands::Upload { path } => {
            let bytes = std::fs::read(&path)?;
            let filename = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();
            if !filename.to_lowercase().ends_with(".pdf") {
                anyhow::bail!("The file must be a PDF: {}", path.display());
            }

            let text = extract::extract_pdf_text(&bytes)?;
            if text.trim().is_empty() {
                anyhow::bail!("The PDF file contains no extractable text.");
            }

            let ctx = AppContext::initialize(&config).await?;
            let draft = draft_from_pdf(&filename, text, content_hash(&bytes));
            match ctx.pipeline.ingest_document(draft).await {
                Ok(UploadOutcome::Duplicate { news_id }) => {
                    println!("already processed, news_id: {}", news_id);
                }
                Ok(UploadOutcome::Ingested { news_id, chunks }) => {
                    println!("ingested {} chunks, news_id: {}", chunks, news_id);
                }
                Err(UploadError::SavedNotEmbedded { news_id, source }) => {
                    anyhow::bail!("record {} saved but not embedded: {}", news_id, source);
                }
                Err(UploadError::NotSaved(source)) => {
                    anyhow::bail!("record not saved: {}", source);
                }
            }
        }

        Commands::Ask { question } => {
            let ctx = AppContext::initialize(&config).await?;
            let answer = ctx.answerer.answer(&question).await?;
            println!("{}", answer);
        }

        Commands::Serve => {
            server::run_server(&config).await?;
        }
    }

    Ok(())
}
