//! Record store abstraction for ingested news documents.
//!
//! The [`RecordStore`] trait defines the durable-storage operations the
//! ingestion pipeline needs, enabling pluggable backends (SQLite,
//! in-memory for tests).
//!
//! Implementations must be `Send + Sync` to work with async runtimes.
//!
//! # Operations
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`save`](RecordStore::save) | Persist a draft with a fresh id, flag false |
//! | [`list_all`](RecordStore::list_all) | Full scan, paging internally until exhausted |
//! | [`find_by_hash`](RecordStore::find_by_hash) | Point lookup via the content-hash index |
//! | [`mark_embedded`](RecordStore::mark_embedded) | Flip `embeddings_generated` to true |

pub mod memory;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{NewsDraft, NewsRecord};

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Assigns a fresh unique id, writes the record with
    /// `embeddings_generated = false`, and returns the id.
    async fn save(&self, draft: &NewsDraft) -> Result<String>;

    /// Returns every record, paging internally until no continuation
    /// remains. Must tolerate an unbounded number of pages.
    async fn list_all(&self) -> Result<Vec<NewsRecord>>;

    /// Point lookup via the secondary content-hash index.
    async fn find_by_hash(&self, hash: &str) -> Result<Option<NewsRecord>>;

    /// Sets `embeddings_generated = true` for the record addressed by the
    /// composite key. Errors if no such record exists.
    ///
    /// Must be called only after every chunk of the document has been
    /// durably upserted into the vector index.
    async fn mark_embedded(&self, id: &str, published_date: &str) -> Result<()>;
}
