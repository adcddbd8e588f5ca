//! Application context: every collaborator constructed once at startup.
//!
//! Replaces ambient global state with an explicit object. Initialization
//! failure is surfaced to the caller, which decides whether to abort (CLI
//! commands) or serve an explicit unavailable state (HTTP server).

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::answer::Answerer;
use crate::chunker::SemanticChunker;
use crate::config::Config;
use crate::db;
use crate::embedding::{Embedder, RemoteEmbedder};
use crate::generation::{Generator, RemoteGenerator};
use crate::index::remote::RemoteVectorIndex;
use crate::index::VectorIndex;
use crate::migrate;
use crate::pipeline::Pipeline;
use crate::store::sqlite::SqliteRecordStore;
use crate::store::RecordStore;

pub struct AppContext {
    pub pipeline: Pipeline,
    pub answerer: Answerer,
}

impl AppContext {
    /// Builds the record store, vector index handle (provisioning the
    /// index if needed), embedding and generation clients, and wires
    /// them into the pipeline and answerer.
    pub async fn initialize(config: &Config) -> Result<Self> {
        let pool = db::connect(&config.store)
            .await
            .context("failed to open record store")?;
        migrate::apply(&pool)
            .await
            .context("failed to apply record store schema")?;
        let store: Arc<dyn RecordStore> =
            Arc::new(SqliteRecordStore::new(pool, config.store.page_size));

        let embedder: Arc<dyn Embedder> = Arc::new(
            RemoteEmbedder::new(&config.embedding).context("failed to build embedding client")?,
        );
        let generator: Arc<dyn Generator> = Arc::new(
            RemoteGenerator::new(&config.generation)
                .context("failed to build generation client")?,
        );
        let index: Arc<dyn VectorIndex> = Arc::new(
            RemoteVectorIndex::ensure(&config.index)
                .await
                .context("failed to provision vector index")?,
        );

        let chunker = SemanticChunker::new(embedder.clone(), &config.chunking);

        let pipeline = Pipeline::new(
            store,
            index.clone(),
            embedder.clone(),
            chunker,
            config.index.namespace.clone(),
            config.index.dimension,
        );
        let answerer = Answerer::new(
            index,
            embedder,
            generator,
            config.index.namespace.clone(),
            config.retrieval.top_k,
        );

        tracing::info!(index = %config.index.name, namespace = %config.index.namespace, "service context initialized");
        Ok(Self { pipeline, answerer })
    }
}
