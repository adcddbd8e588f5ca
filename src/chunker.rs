//! Embedding-similarity text chunker.
//!
//! Splits document text into semantically coherent chunks rather than
//! fixed-length windows: sentence-level units are embedded in one batch,
//! the cosine distance between each pair of consecutive units is
//! computed, and a chunk boundary is cut wherever the distance exceeds an
//! adaptive threshold — a configurable percentile of the observed
//! distances. Output is deterministic for the same text and embedder.
//!
//! Empty, whitespace-only, or non-meaningful input (no alphanumeric
//! sentence units) yields zero chunks; callers treat that as a
//! processing failure for the document, not a successful no-op.

use std::sync::Arc;

use anyhow::Result;

use crate::config::ChunkingConfig;
use crate::embedding::{cosine_similarity, Embedder};

pub struct SemanticChunker {
    embedder: Arc<dyn Embedder>,
    breakpoint_percentile: f64,
}

impl SemanticChunker {
    pub fn new(embedder: Arc<dyn Embedder>, config: &ChunkingConfig) -> Self {
        Self {
            embedder,
            breakpoint_percentile: config.breakpoint_percentile,
        }
    }

    /// Split `text` into ordered semantic chunks.
    pub async fn chunk(&self, text: &str) -> Result<Vec<String>> {
        let units = split_sentences(text);

        if units.is_empty() {
            return Ok(Vec::new());
        }
        if units.len() == 1 {
            return Ok(units);
        }

        let embeddings = self.embedder.embed_batch(&units).await?;

        let distances: Vec<f64> = embeddings
            .windows(2)
            .map(|pair| 1.0 - cosine_similarity(&pair[0], &pair[1]) as f64)
            .collect();
        let threshold = percentile(&distances, self.breakpoint_percentile);

        let mut chunks = Vec::new();
        let mut current = vec![units[0].as_str()];
        for (i, unit) in units.iter().enumerate().skip(1) {
            if distances[i - 1] > threshold {
                chunks.push(current.join(" "));
                current = Vec::new();
            }
            current.push(unit.as_str());
        }
        chunks.push(current.join(" "));

        Ok(chunks)
    }
}

/// Split text into sentence-level units.
///
/// Paragraph breaks are hard boundaries; within a paragraph, a sentence
/// ends at `.`, `!`, or `?` followed by whitespace. Units without any
/// alphanumeric content are dropped.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();

    for paragraph in text.split("\n\n") {
        let mut current = String::new();
        let mut chars = paragraph.chars().peekable();

        while let Some(c) = chars.next() {
            current.push(c);
            let terminal = matches!(c, '.' | '!' | '?');
            if terminal && chars.peek().is_none_or(|next| next.is_whitespace()) {
                push_unit(&mut sentences, &current);
                current.clear();
            }
        }
        push_unit(&mut sentences, &current);
    }

    sentences
}

fn push_unit(sentences: &mut Vec<String>, raw: &str) {
    let trimmed = raw.trim();
    if trimmed.chars().any(|c| c.is_alphanumeric()) {
        sentences.push(trimmed.to_string());
    }
}

/// Percentile with linear interpolation over the sorted values.
fn percentile(values: &[f64], p: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    if sorted.len() == 1 {
        return sorted[0];
    }

    let rank = (p / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
    }
}
