//! Core data models used throughout newsrag.
//!
//! These types represent the news records, pending chunks, and index
//! entries that flow through the ingestion and answering pipeline.

use serde::{Deserialize, Serialize};

/// A news document before the record store has assigned it an id.
///
/// Produced by the upload path (PDF extraction) or by external feed
/// ingestion. `content_hash` is the SHA-256 hex digest of the raw bytes
/// the content was extracted from, used for deduplication.
#[derive(Debug, Clone)]
pub struct NewsDraft {
    pub title: String,
    pub url: String,
    pub content: String,
    pub published_date: String,
    pub source: String,
    pub content_hash: Option<String>,
    pub keywords: Option<Vec<String>>,
    pub categories: Option<Vec<String>>,
    pub summary: Option<String>,
}

/// A news document as persisted in the record store.
///
/// `(id, published_date)` is the store's composite key. The record is
/// written once with `embeddings_generated = false` and mutated exactly
/// once, to flip the flag, after every chunk has been upserted into the
/// vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsRecord {
    pub id: String,
    pub title: String,
    pub url: String,
    pub content: String,
    pub published_date: String,
    pub source: String,
    pub embeddings_generated: bool,
    pub content_hash: Option<String>,
    pub keywords: Option<Vec<String>>,
    pub categories: Option<Vec<String>>,
    pub summary: Option<String>,
}

impl NewsRecord {
    /// Materializes a stored record from a draft and a freshly assigned id.
    pub fn from_draft(id: String, draft: &NewsDraft) -> Self {
        Self {
            id,
            title: draft.title.clone(),
            url: draft.url.clone(),
            content: draft.content.clone(),
            published_date: draft.published_date.clone(),
            source: draft.source.clone(),
            embeddings_generated: false,
            content_hash: draft.content_hash.clone(),
            keywords: draft.keywords.clone(),
            categories: draft.categories.clone(),
            summary: draft.summary.clone(),
        }
    }
}

/// A chunk of a document queued for embedding and upsert.
///
/// Carries everything needed to build the index entry; the vector itself
/// is computed just-in-time by the batch driver.
#[derive(Debug, Clone)]
pub struct PendingEntry {
    pub id: String,
    pub doc_id: String,
    pub chunk: usize,
    pub total_chunks: usize,
    pub dimension: usize,
    pub title: String,
    pub text: String,
}

/// Metadata stored alongside each vector in the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMetadata {
    pub original_doc_id: String,
    pub chunk: usize,
    pub total_chunks: usize,
    pub dimension: usize,
    pub title: String,
    pub text: String,
}

/// One point written to the similarity index.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: EntryMetadata,
}

/// A similarity hit returned from the vector index.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub id: String,
    pub score: f32,
    pub metadata: EntryMetadata,
}

/// Deterministic index entry id for a document chunk.
///
/// Re-running ingestion for the same document produces identical ids, so
/// repeat upserts overwrite instead of duplicating.
pub fn chunk_entry_id(doc_id: &str, chunk_index: usize) -> String {
    format!("{}_c{}", doc_id, chunk_index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_id_is_deterministic() {
        assert_eq!(chunk_entry_id("abc", 0), "abc_c0");
        assert_eq!(chunk_entry_id("abc", 12), "abc_c12");
        assert_eq!(chunk_entry_id("abc", 12), chunk_entry_id("abc", 12));
    }

    #[test]
    fn from_draft_starts_unembedded() {
        let draft = NewsDraft {
            title: "T".into(),
            url: "https://example.com".into(),
            content: "body".into(),
            published_date: "2025-06-01T00:00:00Z".into(),
            source: "feed".into(),
            content_hash: Some("deadbeef".into()),
            keywords: None,
            categories: None,
            summary: None,
        };
        let record = NewsRecord::from_draft("id-1".into(), &draft);
        assert!(!record.embeddings_generated);
        assert_eq!(record.id, "id-1");
        assert_eq!(record.content_hash.as_deref(), Some("deadbeef"));
    }
}
