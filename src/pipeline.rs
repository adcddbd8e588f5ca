//! Ingestion pipeline orchestration.
//!
//! Owns the consistency contract between the record store and the vector
//! index. Per document, the flow is:
//!
//! ```text
//! NEW → (hash lookup) → DUPLICATE (short-circuit, return existing id)
//! NEW → (hash lookup miss) → SAVED (record persisted, flag=false)
//! SAVED → (chunk) → CHUNKED | FAILED(no-chunks)
//! CHUNKED → (upsert all batches) → EMBEDDED (flag set true) | FAILED(upsert-error)
//! ```
//!
//! The `embeddings_generated` flag is set only after every batch of the
//! document's chunks has been durably upserted — never before. There is
//! no cross-store transaction: a crash between "chunks upserted" and
//! "flag set" leaves the record re-ingestable; deterministic entry ids
//! make the retry converge by overwrite.

use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::chunker::SemanticChunker;
use crate::embedding::Embedder;
use crate::error::PipelineError;
use crate::index::{self, VectorIndex};
use crate::models::{chunk_entry_id, NewsDraft, NewsRecord, PendingEntry};
use crate::store::RecordStore;

/// SHA-256 hex digest of raw content bytes, used for dedup.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Shapes an uploaded PDF into a draft record: the title comes from the
/// filename (separators spaced out, words capitalized), the publication
/// date is the upload time.
pub fn draft_from_pdf(filename: &str, text: String, hash: String) -> NewsDraft {
    let stem = filename.strip_suffix(".pdf").unwrap_or(filename);
    let title = stem
        .replace(['_', '-'], " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ");

    NewsDraft {
        title,
        url: format!("file_upload://{}", filename),
        content: text,
        published_date: chrono::Utc::now().to_rfc3339(),
        source: "PDF Upload".to_string(),
        content_hash: Some(hash),
        keywords: None,
        categories: None,
        summary: None,
    }
}

/// Outcome of processing a single already-saved record.
#[derive(Debug)]
pub enum IngestOutcome {
    /// The record already carried `embeddings_generated = true`.
    AlreadyEmbedded,
    /// All chunks upserted and the flag flipped.
    Embedded { chunks: usize },
}

/// Outcome of the upload path (dedup → save → embed).
#[derive(Debug)]
pub enum UploadOutcome {
    /// Byte-identical content was ingested before; no new record.
    Duplicate { news_id: String },
    /// A new record was saved and fully embedded.
    Ingested { news_id: String, chunks: usize },
}

/// Failure of the upload path, distinguishing how far it got.
#[derive(Debug)]
pub enum UploadError {
    /// The record was never persisted.
    NotSaved(PipelineError),
    /// The record exists (flag false) but chunking or upsert failed;
    /// a later `ingest_pending` pass will retry it.
    SavedNotEmbedded {
        news_id: String,
        source: PipelineError,
    },
}

/// Aggregate result of an `ingest_pending` run.
#[derive(Debug, Default)]
pub struct PendingSummary {
    pub total: usize,
    pub embedded: usize,
    pub already_embedded: usize,
    pub failed: Vec<(String, PipelineError)>,
}

/// The explicit pipeline context: every collaborator is constructed once
/// at startup and passed in, replacing ambient globals.
pub struct Pipeline {
    store: Arc<dyn RecordStore>,
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    chunker: SemanticChunker,
    namespace: String,
    dimension: usize,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn RecordStore>,
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn Embedder>,
        chunker: SemanticChunker,
        namespace: String,
        dimension: usize,
    ) -> Self {
        Self {
            store,
            index,
            embedder,
            chunker,
            namespace,
            dimension,
        }
    }

    /// Chunk, embed, and upsert one saved record, then flip its flag.
    ///
    /// Idempotent no-op when the record is already embedded.
    pub async fn ingest_one(&self, record: &NewsRecord) -> Result<IngestOutcome, PipelineError> {
        if record.embeddings_generated {
            tracing::info!(id = %record.id, "embeddings already generated, skipping");
            return Ok(IngestOutcome::AlreadyEmbedded);
        }

        if record.content.trim().is_empty() || record.published_date.is_empty() {
            return Err(PipelineError::InvalidInput(
                "record has empty content or published date".to_string(),
            ));
        }

        let chunks = self
            .chunker
            .chunk(&record.content)
            .await
            .map_err(PipelineError::Chunking)?;
        let total_chunks = chunks.len();
        if total_chunks == 0 {
            tracing::warn!(id = %record.id, "no chunks produced, skipping");
            return Err(PipelineError::NoChunks);
        }

        let pending: Vec<PendingEntry> = chunks
            .into_iter()
            .enumerate()
            .map(|(idx, text)| PendingEntry {
                id: chunk_entry_id(&record.id, idx),
                doc_id: record.id.clone(),
                chunk: idx,
                total_chunks,
                dimension: self.dimension,
                title: record.title.clone(),
                text,
            })
            .collect();

        tracing::info!(id = %record.id, chunks = total_chunks, "upserting chunks into vector index");
        index::upsert_chunks(
            self.index.as_ref(),
            self.embedder.as_ref(),
            &pending,
            &self.namespace,
        )
        .await?;

        // All batches committed; only now may the record claim completion.
        self.store
            .mark_embedded(&record.id, &record.published_date)
            .await
            .map_err(PipelineError::StoreWrite)?;

        tracing::info!(id = %record.id, "embeddings_generated flag set");
        Ok(IngestOutcome::Embedded {
            chunks: total_chunks,
        })
    }

    /// Dedup lookup with the documented degrade policy: a lookup failure
    /// is treated as "no match" and logged so operators can reconcile,
    /// rather than blocking ingestion.
    pub async fn check_duplicate(&self, hash: &str) -> Option<String> {
        match self.store.find_by_hash(hash).await {
            Ok(Some(existing)) => {
                tracing::info!(hash = %hash, news_id = %existing.id, "content already ingested");
                Some(existing.id)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(hash = %hash, error = %e, "content-hash lookup failed, assuming not a duplicate");
                None
            }
        }
    }

    /// Upload path: dedup by content hash, save, then embed.
    pub async fn ingest_document(&self, draft: NewsDraft) -> Result<UploadOutcome, UploadError> {
        if let Some(hash) = &draft.content_hash {
            if let Some(news_id) = self.check_duplicate(hash).await {
                return Ok(UploadOutcome::Duplicate { news_id });
            }
        }

        let news_id = self
            .store
            .save(&draft)
            .await
            .map_err(|e| UploadError::NotSaved(PipelineError::StoreWrite(e)))?;
        tracing::info!(news_id = %news_id, title = %draft.title, "record saved");

        let record = NewsRecord::from_draft(news_id.clone(), &draft);
        match self.ingest_one(&record).await {
            Ok(IngestOutcome::Embedded { chunks }) => {
                Ok(UploadOutcome::Ingested { news_id, chunks })
            }
            Ok(IngestOutcome::AlreadyEmbedded) => {
                Ok(UploadOutcome::Ingested { news_id, chunks: 0 })
            }
            Err(source) => Err(UploadError::SavedNotEmbedded { news_id, source }),
        }
    }

    /// Batch driver: process every record not yet embedded.
    ///
    /// One document's failure never aborts the run; per-document outcomes
    /// are collected for observability.
    pub async fn ingest_pending(&self) -> Result<PendingSummary, PipelineError> {
        let records = self
            .store
            .list_all()
            .await
            .map_err(PipelineError::StoreRead)?;

        let mut summary = PendingSummary {
            total: records.len(),
            ..Default::default()
        };
        tracing::info!(total = records.len(), "processing pending records");

        for record in &records {
            if record.embeddings_generated {
                summary.already_embedded += 1;
                continue;
            }
            match self.ingest_one(record).await {
                Ok(_) => summary.embedded += 1,
                Err(e) => {
                    tracing::warn!(id = %record.id, error = %e, "failed to ingest record");
                    summary.failed.push((record.id.clone(), e));
                }
            }
        }

        Ok(summary)
    }
}
