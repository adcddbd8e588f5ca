//! Error taxonomy for the ingestion and answering pipeline.
//!
//! Collaborator seams (record store, vector index, embedding, generation)
//! return `anyhow::Result`; the pipeline classifies those failures into
//! this enum so callers can react precisely — the batch driver isolates
//! per-document failures, the upload path distinguishes "saved but not
//! embedded" from "not saved at all", and the HTTP layer maps variants to
//! a small fixed set of user-facing messages.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The record store rejected or failed a write.
    #[error("record store write failed: {0}")]
    StoreWrite(#[source] anyhow::Error),

    /// The record store failed a read. Dedup lookups degrade this to
    /// "not found"; full scans surface it.
    #[error("record store read failed: {0}")]
    StoreRead(#[source] anyhow::Error),

    /// The chunker produced zero chunks for a document. Callers treat
    /// this as a processing failure, never a successful no-op.
    #[error("no chunks produced from document text")]
    NoChunks,

    /// Chunking itself failed (for example, the embedding call used to
    /// find semantic boundaries errored).
    #[error("failed to chunk document: {0}")]
    Chunking(#[source] anyhow::Error),

    /// A specific upsert batch failed. Earlier batches stay committed;
    /// deterministic entry ids make the retry converge by overwrite.
    #[error("vector index upsert failed on batch {batch} of {batches} ({committed} entries already committed): {source}")]
    IndexWrite {
        batch: usize,
        batches: usize,
        committed: usize,
        #[source]
        source: anyhow::Error,
    },

    /// The pipeline context never initialized (missing credentials or
    /// unreachable index at startup).
    #[error("service is not available: {0}")]
    Unavailable(String),

    /// The language model invocation (or the retrieval feeding it) failed.
    #[error("answer generation failed: {0}")]
    Generation(#[source] anyhow::Error),

    /// The caller supplied unusable input (missing question, non-PDF
    /// upload, empty extracted text, empty filename).
    #[error("invalid input: {0}")]
    InvalidInput(String),
}
