//! Vector index abstraction and the batched upsert driver.
//!
//! The [`VectorIndex`] trait covers the two data-plane operations the
//! pipeline needs — upsert and similarity query, both scoped to a
//! namespace. [`remote::RemoteVectorIndex`] talks to the backing index
//! service; [`memory::MemoryVectorIndex`] is a brute-force implementation
//! for tests.
//!
//! [`upsert_chunks`] owns the batching policy: pending entries are
//! partitioned into fixed batches, each batch's texts are embedded
//! just-in-time, and one upsert call is issued per batch. A failing batch
//! aborts the call with its batch number; earlier batches stay committed
//! (at-least-once — deterministic entry ids make the retry overwrite
//! rather than duplicate).

pub mod memory;
pub mod remote;

use anyhow::Result;
use async_trait::async_trait;

use crate::embedding::Embedder;
use crate::error::PipelineError;
use crate::models::{EntryMetadata, IndexEntry, PendingEntry, SearchHit};

/// Entries per upsert call, chosen to stay under the backing index's
/// per-call payload limit.
pub const UPSERT_BATCH_SIZE: usize = 96;

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert-or-overwrite entries, keyed by entry id, in a namespace.
    async fn upsert(&self, entries: &[IndexEntry], namespace: &str) -> Result<()>;

    /// Top-k nearest entries to `vector` within a namespace.
    async fn query(&self, vector: &[f32], top_k: usize, namespace: &str)
        -> Result<Vec<SearchHit>>;
}

/// Embeds and upserts pending entries in batches of [`UPSERT_BATCH_SIZE`].
///
/// Returns the number of entries upserted. On a batch failure, reports
/// the 1-based batch number, the total batch count, and how many entries
/// were already committed.
pub async fn upsert_chunks(
    index: &dyn VectorIndex,
    embedder: &dyn Embedder,
    pending: &[PendingEntry],
    namespace: &str,
) -> Result<usize, PipelineError> {
    let batches = pending.len().div_ceil(UPSERT_BATCH_SIZE);
    let mut committed = 0usize;

    for (batch_idx, batch) in pending.chunks(UPSERT_BATCH_SIZE).enumerate() {
        match upsert_one_batch(index, embedder, batch, namespace).await {
            Ok(()) => {
                committed += batch.len();
                tracing::info!(
                    batch = batch_idx + 1,
                    batches,
                    committed,
                    "upserted batch into vector index"
                );
            }
            Err(source) => {
                return Err(PipelineError::IndexWrite {
                    batch: batch_idx + 1,
                    batches,
                    committed,
                    source,
                });
            }
        }
    }

    Ok(committed)
}

async fn upsert_one_batch(
    index: &dyn VectorIndex,
    embedder: &dyn Embedder,
    batch: &[PendingEntry],
    namespace: &str,
) -> Result<()> {
    let texts: Vec<String> = batch.iter().map(|p| p.text.clone()).collect();
    let vectors = embedder.embed_batch(&texts).await?;

    let entries: Vec<IndexEntry> = batch
        .iter()
        .zip(vectors)
        .map(|(p, values)| IndexEntry {
            id: p.id.clone(),
            values,
            metadata: EntryMetadata {
                original_doc_id: p.doc_id.clone(),
                chunk: p.chunk,
                total_chunks: p.total_chunks,
                dimension: p.dimension,
                title: p.title.clone(),
                text: p.text.clone(),
            },
        })
        .collect();

    index.upsert(&entries, namespace).await
}
