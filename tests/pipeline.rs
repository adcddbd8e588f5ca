//! Integration tests for the ingestion pipeline and answering flow,
//! exercised against the in-memory store, in-memory index, and the
//! deterministic mock embedder.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;

use newsrag::error::PipelineError;
use newsrag::index::memory::MemoryVectorIndex;
use newsrag::index::{upsert_chunks, VectorIndex, UPSERT_BATCH_SIZE};
use newsrag::models::{chunk_entry_id, IndexEntry, NewsRecord, PendingEntry, SearchHit};
use newsrag::embedding::MockEmbedder;
use newsrag::pipeline::{IngestOutcome, UploadError, UploadOutcome};
use newsrag::store::memory::MemoryRecordStore;
use newsrag::store::RecordStore;

use common::{draft, test_answerer, test_pipeline, MYOPIA_TEXT, NAMESPACE};

/// Index that fails one specific upsert call (1-based), delegating every
/// other operation to an inner in-memory index.
struct FlakyIndex {
    inner: MemoryVectorIndex,
    fail_on_call: usize,
    calls: AtomicUsize,
}

impl FlakyIndex {
    fn new(fail_on_call: usize) -> Self {
        Self {
            inner: MemoryVectorIndex::new(),
            fail_on_call,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl VectorIndex for FlakyIndex {
    async fn upsert(&self, entries: &[IndexEntry], namespace: &str) -> Result<()> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.fail_on_call {
            bail!("injected upsert failure on call {}", call);
        }
        self.inner.upsert(entries, namespace).await
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        namespace: &str,
    ) -> Result<Vec<SearchHit>> {
        self.inner.query(vector, top_k, namespace).await
    }
}

fn make_pending(count: usize) -> Vec<PendingEntry> {
    (0..count)
        .map(|i| PendingEntry {
            id: chunk_entry_id("doc", i),
            doc_id: "doc".to_string(),
            chunk: i,
            total_chunks: count,
            dimension: common::DIMENSION,
            title: "Doc".to_string(),
            text: format!("entry number {}", i),
        })
        .collect()
}

// ============ Scenario A: end-to-end ingestion ============

#[tokio::test]
async fn scenario_a_ingest_document_end_to_end() {
    let store = Arc::new(MemoryRecordStore::new());
    let index = Arc::new(MemoryVectorIndex::new());
    let pipeline = test_pipeline(store.clone(), index.clone());

    let outcome = pipeline
        .ingest_document(draft("Myopia Study", MYOPIA_TEXT))
        .await
        .unwrap();

    let (news_id, chunks) = match outcome {
        UploadOutcome::Ingested { news_id, chunks } => (news_id, chunks),
        other => panic!("expected Ingested, got {:?}", other),
    };
    assert!(chunks >= 1);

    // Deterministic, contiguous entry ids
    let expected_ids: Vec<String> = (0..chunks).map(|i| chunk_entry_id(&news_id, i)).collect();
    let mut sorted_expected = expected_ids.clone();
    sorted_expected.sort();
    assert_eq!(index.ids(NAMESPACE), sorted_expected);

    // Every entry carries the same total_chunks and the index dimension
    for (i, id) in expected_ids.iter().enumerate() {
        let entry = index.get(NAMESPACE, id).unwrap();
        assert_eq!(entry.metadata.chunk, i);
        assert_eq!(entry.metadata.total_chunks, chunks);
        assert_eq!(entry.metadata.dimension, common::DIMENSION);
        assert_eq!(entry.metadata.original_doc_id, news_id);
        assert_eq!(entry.values.len(), common::DIMENSION);
    }

    // Flag transitioned false → true
    let record = store.get(&news_id).unwrap();
    assert!(record.embeddings_generated);
}

// ============ Idempotence ============

#[tokio::test]
async fn test_second_ingest_of_same_content_is_duplicate() {
    let store = Arc::new(MemoryRecordStore::new());
    let index = Arc::new(MemoryVectorIndex::new());
    let pipeline = test_pipeline(store.clone(), index.clone());

    let first = pipeline
        .ingest_document(draft("Myopia Study", MYOPIA_TEXT))
        .await
        .unwrap();
    let UploadOutcome::Ingested { news_id, .. } = first else {
        panic!("expected Ingested");
    };
    let entries_after_first = index.count(NAMESPACE);

    let second = pipeline
        .ingest_document(draft("Myopia Study Again", MYOPIA_TEXT))
        .await
        .unwrap();
    match second {
        UploadOutcome::Duplicate { news_id: existing } => assert_eq!(existing, news_id),
        other => panic!("expected Duplicate, got {:?}", other),
    }

    assert_eq!(store.len(), 1);
    assert_eq!(index.count(NAMESPACE), entries_after_first);
}

#[tokio::test]
async fn test_ingest_one_is_noop_for_embedded_record() {
    let store = Arc::new(MemoryRecordStore::new());
    let index = Arc::new(MemoryVectorIndex::new());
    let pipeline = test_pipeline(store.clone(), index.clone());

    let outcome = pipeline
        .ingest_document(draft("Myopia Study", MYOPIA_TEXT))
        .await
        .unwrap();
    let UploadOutcome::Ingested { news_id, .. } = outcome else {
        panic!("expected Ingested");
    };
    let calls_after_first = index.upsert_calls();

    let record = store.get(&news_id).unwrap();
    let outcome = pipeline.ingest_one(&record).await.unwrap();
    assert!(matches!(outcome, IngestOutcome::AlreadyEmbedded));
    assert_eq!(index.upsert_calls(), calls_after_first);
}

#[tokio::test]
async fn test_reingest_with_stale_flag_overwrites_not_duplicates() {
    let store = Arc::new(MemoryRecordStore::new());
    let index = Arc::new(MemoryVectorIndex::new());
    let pipeline = test_pipeline(store.clone(), index.clone());

    let d = draft("Myopia Study", MYOPIA_TEXT);
    let id = store.save(&d).await.unwrap();
    let record = NewsRecord::from_draft(id, &d);

    pipeline.ingest_one(&record).await.unwrap();
    let ids_first = index.ids(NAMESPACE);

    // A stale caller view (flag still false) re-runs the whole flow;
    // deterministic ids make the upsert overwrite.
    pipeline.ingest_one(&record).await.unwrap();
    assert_eq!(index.ids(NAMESPACE), ids_first);
    assert_eq!(index.count(NAMESPACE), ids_first.len());
}

// ============ Flag ordering and at-least-once convergence ============

#[tokio::test]
async fn test_flag_stays_false_when_upsert_fails_then_retry_converges() {
    let store = Arc::new(MemoryRecordStore::new());
    let flaky = Arc::new(FlakyIndex::new(1));
    let pipeline = test_pipeline_with_index(store.clone(), flaky.clone());

    let err = pipeline
        .ingest_document(draft("Myopia Study", MYOPIA_TEXT))
        .await
        .unwrap_err();

    let news_id = match err {
        UploadError::SavedNotEmbedded { news_id, source } => {
            assert!(matches!(source, PipelineError::IndexWrite { .. }));
            news_id
        }
        other => panic!("expected SavedNotEmbedded, got {:?}", other),
    };

    // Saved, but never claimed completion
    let record = store.get(&news_id).unwrap();
    assert!(!record.embeddings_generated);
    assert_eq!(flaky.inner.count(NAMESPACE), 0);

    // The next pending pass retries the same record and converges.
    let summary = pipeline.ingest_pending().await.unwrap();
    assert_eq!(summary.embedded, 1);
    assert!(summary.failed.is_empty());
    assert!(store.get(&news_id).unwrap().embeddings_generated);
    assert!(flaky.inner.count(NAMESPACE) >= 1);
}

fn test_pipeline_with_index(
    store: Arc<MemoryRecordStore>,
    index: Arc<FlakyIndex>,
) -> newsrag::pipeline::Pipeline {
    let embedder = Arc::new(MockEmbedder::new(common::DIMENSION));
    let chunker = newsrag::chunker::SemanticChunker::new(
        embedder.clone(),
        &newsrag::config::ChunkingConfig::default(),
    );
    newsrag::pipeline::Pipeline::new(
        store,
        index,
        embedder,
        chunker,
        NAMESPACE.to_string(),
        common::DIMENSION,
    )
}

// ============ Batch driver: ingest_pending isolation ============

#[tokio::test]
async fn test_ingest_pending_isolates_per_document_failures() {
    let store = Arc::new(MemoryRecordStore::new());
    let index = Arc::new(MemoryVectorIndex::new());
    let pipeline = test_pipeline(store.clone(), index.clone());

    store.save(&draft("Good One", MYOPIA_TEXT)).await.unwrap();
    let bad_id = store.save(&draft("Empty One", "   ")).await.unwrap();
    store
        .save(&draft(
            "Good Two",
            "Container orchestration schedules workloads. Rollouts happen gradually.",
        ))
        .await
        .unwrap();

    let summary = pipeline.ingest_pending().await.unwrap();

    assert_eq!(summary.total, 3);
    assert_eq!(summary.embedded, 2);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].0, bad_id);
    assert!(!store.get(&bad_id).unwrap().embeddings_generated);

    // A second pass skips the embedded ones entirely.
    let summary = pipeline.ingest_pending().await.unwrap();
    assert_eq!(summary.already_embedded, 2);
    assert_eq!(summary.embedded, 0);
    assert_eq!(summary.failed.len(), 1);
}

// ============ Batch partitioning ============

#[tokio::test]
async fn test_upsert_partitions_into_96_entry_batches() {
    let index = MemoryVectorIndex::new();
    let embedder = MockEmbedder::new(common::DIMENSION);
    let pending = make_pending(250);

    let committed = upsert_chunks(&index, &embedder, &pending, NAMESPACE)
        .await
        .unwrap();

    assert_eq!(committed, 250);
    assert_eq!(index.count(NAMESPACE), 250);
    // ceil(250 / 96) = 3 network calls
    assert_eq!(index.upsert_calls(), 250usize.div_ceil(UPSERT_BATCH_SIZE));
    assert_eq!(index.upsert_calls(), 3);
}

#[tokio::test]
async fn test_upsert_failure_reports_batch_and_committed_count() {
    let flaky = FlakyIndex::new(2);
    let embedder = MockEmbedder::new(common::DIMENSION);
    let pending = make_pending(200);

    let err = upsert_chunks(&flaky, &embedder, &pending, NAMESPACE)
        .await
        .unwrap_err();

    match err {
        PipelineError::IndexWrite {
            batch,
            batches,
            committed,
            ..
        } => {
            assert_eq!(batch, 2);
            assert_eq!(batches, 3);
            assert_eq!(committed, UPSERT_BATCH_SIZE);
        }
        other => panic!("expected IndexWrite, got {:?}", other),
    }

    // Batch 1 stays committed; nothing rolled back.
    assert_eq!(flaky.inner.count(NAMESPACE), UPSERT_BATCH_SIZE);
}

// ============ Zero chunks ============

#[tokio::test]
async fn test_empty_content_is_a_failure_not_a_noop() {
    let store = Arc::new(MemoryRecordStore::new());
    let index = Arc::new(MemoryVectorIndex::new());
    let pipeline = test_pipeline(store.clone(), index.clone());

    let d = draft("Empty", "   \n\n  ");
    let id = store.save(&d).await.unwrap();
    let record = NewsRecord::from_draft(id.clone(), &d);

    let err = pipeline.ingest_one(&record).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::InvalidInput(_) | PipelineError::NoChunks
    ));
    assert_eq!(index.count(NAMESPACE), 0);
    assert!(!store.get(&id).unwrap().embeddings_generated);
}

// ============ Scenario B: retrieval-augmented answering ============

#[tokio::test]
async fn scenario_b_answer_is_grounded_in_retrieved_chunks() {
    let store = Arc::new(MemoryRecordStore::new());
    let index = Arc::new(MemoryVectorIndex::new());
    let pipeline = test_pipeline(store.clone(), index.clone());

    pipeline
        .ingest_document(draft("Myopia Study", MYOPIA_TEXT))
        .await
        .unwrap();
    pipeline
        .ingest_document(draft(
            "Cluster Notes",
            "Container orchestration schedules workloads. Rollouts happen gradually.",
        ))
        .await
        .unwrap();

    let answerer = test_answerer(index.clone());
    let answer = answerer.answer("What is myopia magna?").await.unwrap();

    // The echo generator reproduces the retrieval context, so the answer
    // must contain the ingested chunk text, ranked above the unrelated one.
    assert!(answer.contains("Myopia magna causes retinal thinning."));
    if let Some(unrelated_pos) = answer.find("Container orchestration") {
        let related_pos = answer.find("Myopia magna").unwrap();
        assert!(related_pos < unrelated_pos);
    }
}

#[tokio::test]
async fn scenario_b_no_matching_chunks_admits_ignorance() {
    let index = Arc::new(MemoryVectorIndex::new());
    let answerer = test_answerer(index);

    let answer = answerer.answer("What is myopia magna?").await.unwrap();
    assert!(answer.contains("do not know"));
}

#[tokio::test]
async fn test_empty_question_is_invalid_input() {
    let index = Arc::new(MemoryVectorIndex::new());
    let answerer = test_answerer(index);

    let err = answerer.answer("   ").await.unwrap_err();
    assert!(matches!(err, PipelineError::InvalidInput(_)));
}
