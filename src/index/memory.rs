//! In-memory [`VectorIndex`] implementation for testing.
//!
//! Namespaced entries behind `std::sync::RwLock`; queries are brute-force
//! cosine similarity over everything in the namespace.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::models::{IndexEntry, SearchHit};

use super::VectorIndex;

/// In-memory index for tests.
#[derive(Default)]
pub struct MemoryVectorIndex {
    namespaces: RwLock<HashMap<String, HashMap<String, IndexEntry>>>,
    upsert_calls: AtomicUsize,
}

impl MemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries stored in a namespace.
    pub fn count(&self, namespace: &str) -> usize {
        let namespaces = self.namespaces.read().unwrap();
        namespaces.get(namespace).map(|m| m.len()).unwrap_or(0)
    }

    /// Entry ids stored in a namespace, sorted.
    pub fn ids(&self, namespace: &str) -> Vec<String> {
        let namespaces = self.namespaces.read().unwrap();
        let mut ids: Vec<String> = namespaces
            .get(namespace)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    /// Snapshot of one entry, for assertions.
    pub fn get(&self, namespace: &str, id: &str) -> Option<IndexEntry> {
        let namespaces = self.namespaces.read().unwrap();
        namespaces.get(namespace).and_then(|m| m.get(id)).cloned()
    }

    /// How many upsert calls have been issued (one per batch).
    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    async fn upsert(&self, entries: &[IndexEntry], namespace: &str) -> Result<()> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        let mut namespaces = self.namespaces.write().unwrap();
        let ns = namespaces.entry(namespace.to_string()).or_default();
        for entry in entries {
            ns.insert(entry.id.clone(), entry.clone());
        }
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        namespace: &str,
    ) -> Result<Vec<SearchHit>> {
        let namespaces = self.namespaces.read().unwrap();
        let mut hits: Vec<SearchHit> = namespaces
            .get(namespace)
            .map(|ns| {
                ns.values()
                    .map(|entry| SearchHit {
                        id: entry.id.clone(),
                        score: cosine_similarity(vector, &entry.values),
                        metadata: entry.metadata.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(top_k);
        Ok(hits)
    }
}
