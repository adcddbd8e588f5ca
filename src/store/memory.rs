//! In-memory [`RecordStore`] implementation for testing.
//!
//! Uses a `Vec` behind `std::sync::RwLock` for thread safety. Paging is
//! irrelevant here; `list_all` returns everything in insertion order.

use std::sync::RwLock;

use anyhow::{bail, Result};
use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{NewsDraft, NewsRecord};

use super::RecordStore;

/// In-memory store for tests.
#[derive(Default)]
pub struct MemoryRecordStore {
    records: RwLock<Vec<NewsRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a record by id, for assertions.
    pub fn get(&self, id: &str) -> Option<NewsRecord> {
        let records = self.records.read().unwrap();
        records.iter().find(|r| r.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn save(&self, draft: &NewsDraft) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let record = NewsRecord::from_draft(id.clone(), draft);
        self.records.write().unwrap().push(record);
        Ok(id)
    }

    async fn list_all(&self) -> Result<Vec<NewsRecord>> {
        Ok(self.records.read().unwrap().clone())
    }

    async fn find_by_hash(&self, hash: &str) -> Result<Option<NewsRecord>> {
        let records = self.records.read().unwrap();
        Ok(records
            .iter()
            .find(|r| r.content_hash.as_deref() == Some(hash))
            .cloned())
    }

    async fn mark_embedded(&self, id: &str, published_date: &str) -> Result<()> {
        let mut records = self.records.write().unwrap();
        match records
            .iter_mut()
            .find(|r| r.id == id && r.published_date == published_date)
        {
            Some(record) => {
                record.embeddings_generated = true;
                Ok(())
            }
            None => bail!("no record with id {} and published_date {}", id, published_date),
        }
    }
}
