//! Shared fixtures: in-memory collaborators wired into a pipeline and
//! answerer, plus a deterministic echo generator.

#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use newsrag::answer::Answerer;
use newsrag::chunker::SemanticChunker;
use newsrag::config::ChunkingConfig;
use newsrag::context::AppContext;
use newsrag::embedding::MockEmbedder;
use newsrag::generation::Generator;
use newsrag::index::memory::MemoryVectorIndex;
use newsrag::models::NewsDraft;
use newsrag::pipeline::{content_hash, Pipeline};
use newsrag::store::memory::MemoryRecordStore;

pub const NAMESPACE: &str = "news-chunks";
pub const DIMENSION: usize = 64;

/// Generator that answers with the retrieval context it was given, or
/// admits ignorance when the context is empty. Lets tests assert that
/// answers are grounded in retrieved chunks without a real model.
pub struct EchoGenerator;

#[async_trait]
impl Generator for EchoGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let context = prompt
            .split("Context:\n")
            .nth(1)
            .and_then(|rest| rest.split("\n\nQuestion:").next())
            .unwrap_or("")
            .trim();
        if context.is_empty() {
            Ok("I do not know.".to_string())
        } else {
            Ok(format!("Based on the context: {}", context))
        }
    }
}

pub fn test_pipeline(store: Arc<MemoryRecordStore>, index: Arc<MemoryVectorIndex>) -> Pipeline {
    let embedder = Arc::new(MockEmbedder::new(DIMENSION));
    let chunker = SemanticChunker::new(embedder.clone(), &ChunkingConfig::default());
    Pipeline::new(
        store,
        index,
        embedder,
        chunker,
        NAMESPACE.to_string(),
        DIMENSION,
    )
}

pub fn test_answerer(index: Arc<MemoryVectorIndex>) -> Answerer {
    Answerer::new(
        index,
        Arc::new(MockEmbedder::new(DIMENSION)),
        Arc::new(EchoGenerator),
        NAMESPACE.to_string(),
        3,
    )
}

pub fn test_context(store: Arc<MemoryRecordStore>, index: Arc<MemoryVectorIndex>) -> AppContext {
    AppContext {
        pipeline: test_pipeline(store, index.clone()),
        answerer: test_answerer(index),
    }
}

/// Draft whose content hash is derived from the content itself, the way
/// the upload path hashes raw bytes.
pub fn draft(title: &str, content: &str) -> NewsDraft {
    NewsDraft {
        title: title.to_string(),
        url: format!("https://news.example.com/{}", title.to_lowercase().replace(' ', "-")),
        content: content.to_string(),
        published_date: "2025-06-01T12:00:00Z".to_string(),
        source: "feed".to_string(),
        content_hash: Some(content_hash(content.as_bytes())),
        keywords: None,
        categories: None,
        summary: None,
    }
}

pub const MYOPIA_TEXT: &str =
    "Myopia magna causes retinal thinning. Treatment involves regular monitoring.";
