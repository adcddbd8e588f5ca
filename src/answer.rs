//! Retrieval-augmented answering.
//!
//! Stateless and side-effect-free: embed the question, retrieve the
//! top-k nearest chunks from the vector index namespace, assemble a
//! grounded prompt, and return the language model's output verbatim.

use std::sync::Arc;

use crate::embedding::{embed_query, Embedder};
use crate::error::PipelineError;
use crate::generation::Generator;
use crate::index::VectorIndex;

/// Instruction template directing the model to answer only from the
/// supplied context and to admit ignorance rather than fabricate.
const PROMPT_TEMPLATE: &str = "\
You are an expert assistant for a news archive. Use the following pieces \
of context to answer the question. If you do not know the answer, say \
that you do not know; do not try to make up an answer.

Context:
{context}

Question: {question}

Answer:";

pub struct Answerer {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    namespace: String,
    top_k: usize,
}

impl Answerer {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        namespace: String,
        top_k: usize,
    ) -> Self {
        Self {
            index,
            embedder,
            generator,
            namespace,
            top_k,
        }
    }

    /// Answer a question from the indexed chunks.
    pub async fn answer(&self, question: &str) -> Result<String, PipelineError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(PipelineError::InvalidInput(
                "question must not be empty".to_string(),
            ));
        }

        let vector = embed_query(self.embedder.as_ref(), question)
            .await
            .map_err(PipelineError::Generation)?;

        let hits = self
            .index
            .query(&vector, self.top_k, &self.namespace)
            .await
            .map_err(PipelineError::Generation)?;

        // Similarity-ranked order, exactly as the index returned it.
        let context = hits
            .iter()
            .map(|hit| hit.metadata.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        tracing::info!(question = %question, retrieved = hits.len(), "assembled retrieval context");

        let prompt = render_prompt(&context, question);
        self.generator
            .generate(&prompt)
            .await
            .map_err(PipelineError::Generation)
    }
}

fn render_prompt(context: &str, question: &str) -> String {
    PROMPT_TEMPLATE
        .replace("{context}", context)
        .replace("{question}", question)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_prompt_substitutes_both_slots() {
        let prompt = render_prompt("chunk one\n\nchunk two", "what happened?");
        assert!(prompt.contains("chunk one\n\nchunk two"));
        assert!(prompt.contains("Question: what happened?"));
        assert!(prompt.contains("do not try to make up an answer"));
        assert!(!prompt.contains("{context}"));
        assert!(!prompt.contains("{question}"));
    }
}
