//! Retrieval and persistence behavior of the vector index.

mod common;

use docchat_rag::{
    FileIndexStore, IndexEntry, IndexStore, RagError, RecursiveChunker, VectorIndex,
    split_documents,
};
use proptest::prelude::*;

use common::{FlakyEmbedder, KeywordEmbedder, TableEmbedder, VOCABULARY, chunk, corpus};

fn five_entries() -> Vec<IndexEntry> {
    let vectors = [
        [1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [0.0, 0.0, 1.0],
        [0.7, 0.7, 0.0],
        [-1.0, 0.0, 0.0],
    ];
    vectors
        .iter()
        .enumerate()
        .map(|(i, v)| IndexEntry { chunk: chunk(&format!("c{}", i + 1), "text"), embedding: v.to_vec() })
        .collect()
}

#[test]
fn retrieves_the_closest_chunk() {
    let index = VectorIndex::from_entries("test", 3, five_entries()).unwrap();

    let results = index.retrieve(&[0.1, 0.05, 0.9], 1).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].chunk.id, "c3");
}

#[test]
fn results_are_ordered_by_descending_similarity() {
    let index = VectorIndex::from_entries("test", 3, five_entries()).unwrap();

    let results = index.retrieve(&[1.0, 0.1, 0.0], 5).unwrap();
    let ids: Vec<_> = results.iter().map(|r| r.chunk.id.as_str()).collect();
    assert_eq!(ids, vec!["c1", "c4", "c2", "c3", "c5"]);
}

#[test]
fn ties_keep_insertion_order() {
    let entries = ["first", "second", "third"]
        .iter()
        .map(|id| IndexEntry { chunk: chunk(id, id), embedding: vec![1.0, 1.0] })
        .collect();
    let index = VectorIndex::from_entries("test", 2, entries).unwrap();

    let ids: Vec<_> =
        index.retrieve(&[1.0, 1.0], 3).unwrap().into_iter().map(|r| r.chunk.id).collect();
    assert_eq!(ids, vec!["first", "second", "third"]);
}

#[test]
fn huge_components_rank_by_direction() {
    let entries = [[0.1, 1.0], [3e19, 3e19], [1.0, 0.05]]
        .iter()
        .enumerate()
        .map(|(i, v)| IndexEntry { chunk: chunk(&format!("c{}", i + 1), "text"), embedding: v.to_vec() })
        .collect();
    let index = VectorIndex::from_entries("test", 2, entries).unwrap();

    let results = index.retrieve(&[1.0, 0.0], 3).unwrap();
    let ids: Vec<_> = results.iter().map(|r| r.chunk.id.as_str()).collect();
    assert_eq!(ids, vec!["c3", "c2", "c1"]);
    assert!((results[1].score - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
}

#[test]
fn k_larger_than_index_returns_everything() {
    let index = VectorIndex::from_entries("test", 3, five_entries()).unwrap();
    assert_eq!(index.retrieve(&[1.0, 0.0, 0.0], 50).unwrap().len(), 5);
}

#[test]
fn zero_k_is_invalid() {
    let index = VectorIndex::from_entries("test", 3, five_entries()).unwrap();
    assert!(matches!(index.retrieve(&[1.0, 0.0, 0.0], 0), Err(RagError::InvalidArgument(_))));
}

#[test]
fn wrong_query_dimensions_are_invalid() {
    let index = VectorIndex::from_entries("test", 3, five_entries()).unwrap();
    assert!(matches!(index.retrieve(&[1.0, 0.0], 1), Err(RagError::InvalidArgument(_))));
}

#[tokio::test]
async fn build_of_empty_corpus_fails() {
    let embedder = KeywordEmbedder::new(&VOCABULARY);
    let chunks = split_documents(&[], &RecursiveChunker::new(100, 10));
    assert!(chunks.is_empty());
    assert!(matches!(VectorIndex::build(&chunks, &embedder).await, Err(RagError::EmptyCorpus)));
}

#[tokio::test]
async fn build_aborts_when_any_chunk_fails_to_embed() {
    let chunks = split_documents(&corpus(), &RecursiveChunker::new(30, 5));
    assert!(chunks.len() > 3);

    let embedder = FlakyEmbedder::new(KeywordEmbedder::new(&VOCABULARY), 3);
    let result = VectorIndex::build_batched(&chunks, &embedder, 2).await;
    assert!(matches!(result, Err(RagError::EmbeddingError { .. })));
}

#[tokio::test]
async fn build_rejects_vectors_of_the_wrong_length() {
    let embedder = TableEmbedder::new(3, &[("a", vec![1.0, 0.0, 0.0]), ("b", vec![1.0, 0.0])]);
    let result = VectorIndex::build(&[chunk("a", "a"), chunk("b", "b")], &embedder).await;
    assert!(matches!(result, Err(RagError::EmbeddingError { .. })));
}

#[tokio::test]
async fn build_records_provider_and_keeps_chunk_order() {
    let chunks = split_documents(&corpus(), &RecursiveChunker::new(1000, 100));
    let embedder = KeywordEmbedder::new(&VOCABULARY);

    let index = VectorIndex::build_batched(&chunks, &embedder, 3).await.unwrap();

    assert_eq!(index.embedding_model(), "keyword-v1");
    assert_eq!(index.dimensions(), VOCABULARY.len());
    let ids: Vec<_> = index.entries().iter().map(|e| e.chunk.id.clone()).collect();
    let expected: Vec<_> = chunks.iter().map(|c| c.id.clone()).collect();
    assert_eq!(ids, expected);
    index.ensure_compatible(&embedder).unwrap();
}

#[tokio::test]
async fn persisted_index_retrieves_the_same_chunks() {
    let chunks = split_documents(&corpus(), &RecursiveChunker::new(40, 10));
    let embedder = KeywordEmbedder::new(&VOCABULARY);
    let index = VectorIndex::build(&chunks, &embedder).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let store = FileIndexStore::new(dir.path());
    store.save(&index).await.unwrap();
    let loaded = store.load().await.unwrap();

    let query = [1.0, 0.0, 1.0, 1.0, 0.0, 0.0];
    let fresh = index.retrieve(&query, 3).unwrap();
    let reloaded = loaded.retrieve(&query, 3).unwrap();

    let fresh_ids: Vec<_> = fresh.iter().map(|r| (&r.chunk.id, r.score)).collect();
    let reloaded_ids: Vec<_> = reloaded.iter().map(|r| (&r.chunk.id, r.score)).collect();
    assert_eq!(fresh_ids, reloaded_ids);
    assert_eq!(loaded, index);
}

#[tokio::test]
async fn concurrent_retrieval_from_a_shared_index() {
    let chunks = split_documents(&corpus(), &RecursiveChunker::new(1000, 100));
    let embedder = KeywordEmbedder::new(&VOCABULARY);
    let index = std::sync::Arc::new(VectorIndex::build(&chunks, &embedder).await.unwrap());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let index = std::sync::Arc::clone(&index);
            tokio::spawn(async move { index.retrieve(&[0.0, 0.0, 0.0, 0.0, 0.0, 1.0], 1) })
        })
        .collect();

    for handle in handles {
        let results = handle.await.unwrap().unwrap();
        assert_eq!(results[0].chunk.document_id, "garden");
    }
}

/// Generate a non-zero L2-normalized embedding of the given dimension.
fn arb_normalized_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim).prop_filter_map(
        "non-zero embedding",
        |mut v| {
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm < 1e-8 {
                return None;
            }
            for val in &mut v {
                *val /= norm;
            }
            Some(v)
        },
    )
}

mod prop_retrieval_ordering {
    use super::*;

    const DIM: usize = 16;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn results_ordered_descending_and_bounded_by_k(
            embeddings in proptest::collection::vec(arb_normalized_embedding(DIM), 1..20),
            query in arb_normalized_embedding(DIM),
            k in 1usize..25,
        ) {
            let count = embeddings.len();
            let entries = embeddings
                .into_iter()
                .enumerate()
                .map(|(i, embedding)| IndexEntry { chunk: chunk(&format!("c{i}"), "text"), embedding })
                .collect();
            let index = VectorIndex::from_entries("prop", DIM, entries).unwrap();

            let results = index.retrieve(&query, k).unwrap();

            prop_assert_eq!(results.len(), k.min(count));
            for window in results.windows(2) {
                prop_assert!(
                    window[0].score >= window[1].score,
                    "results not in descending order: {} < {}",
                    window[0].score,
                    window[1].score,
                );
            }
        }
    }
}
