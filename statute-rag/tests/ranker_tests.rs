//! Ordering and bounds of cosine-similarity ranking.

use proptest::prelude::*;
use statute_rag::{Chunk, SimilarityRanker, cosine_similarity, rank};

fn chunk(id: usize, embedding: Option<Vec<f32>>) -> Chunk {
    Chunk { id, text: format!("chunk {id}"), embedding, summary: None }
}

#[test]
fn ranks_the_worked_example() {
    let chunks = vec![
        chunk(0, Some(vec![1.0, 0.0])),
        chunk(1, Some(vec![0.0, 1.0])),
        chunk(2, Some(vec![0.7, 0.7])),
    ];

    let ranked = rank(&[1.0, 0.0], &chunks, 2);

    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].chunk.id, 0);
    assert!((ranked[0].similarity_score - 1.0).abs() < 1e-6);
    assert_eq!(ranked[1].chunk.id, 2);
    assert!((ranked[1].similarity_score - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-3);
}

#[test]
fn leaves_input_chunks_untouched() {
    let chunks = vec![chunk(0, Some(vec![1.0, 0.0])), chunk(1, Some(vec![0.0, 1.0]))];
    let before = chunks.clone();
    let _ = rank(&[0.0, 1.0], &chunks, 5);
    assert_eq!(chunks, before);
}

#[test]
fn excludes_chunks_without_usable_embeddings() {
    let chunks = vec![
        chunk(0, None),
        chunk(1, Some(vec![1.0, 0.0, 0.0])),
        chunk(2, Some(vec![0.5, 0.5])),
    ];

    let ranked = rank(&[1.0, 0.0], &chunks, 10);

    let ids: Vec<usize> = ranked.iter().map(|r| r.chunk.id).collect();
    assert_eq!(ids, [2]);
}

#[test]
fn ties_keep_chunk_order() {
    let chunks = vec![
        chunk(3, Some(vec![0.0, 1.0])),
        chunk(1, Some(vec![2.0, 0.0])),
        chunk(0, Some(vec![1.0, 0.0])),
        chunk(2, Some(vec![3.0, 0.0])),
    ];

    let ranked = SimilarityRanker::new(3).rank(&[1.0, 0.0], &chunks);

    let ids: Vec<usize> = ranked.iter().map(|r| r.chunk.id).collect();
    assert_eq!(ids, [0, 1, 2]);
}

fn arb_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim)
}

fn arb_chunks(dim: usize) -> impl Strategy<Value = Vec<Chunk>> {
    proptest::collection::vec(proptest::option::weighted(0.8, arb_embedding(dim)), 0..30).prop_map(
        |embeddings| {
            embeddings.into_iter().enumerate().map(|(id, e)| chunk(id, e)).collect()
        },
    )
}

mod prop_ranking {
    use super::*;

    const DIM: usize = 8;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn results_ordered_descending_and_bounded_by_top_n(
            chunks in arb_chunks(DIM),
            query in arb_embedding(DIM),
            top_n in 0usize..40,
        ) {
            let ranked = rank(&query, &chunks, top_n);
            let embedded = chunks.iter().filter(|c| c.embedding.is_some()).count();

            prop_assert_eq!(ranked.len(), top_n.min(embedded));
            for window in ranked.windows(2) {
                prop_assert!(window[0].similarity_score >= window[1].similarity_score);
                if window[0].similarity_score == window[1].similarity_score {
                    prop_assert!(window[0].chunk.id < window[1].chunk.id);
                }
            }
            for result in &ranked {
                prop_assert!(result.similarity_score >= -1.0 - 1e-5);
                prop_assert!(result.similarity_score <= 1.0 + 1e-5);
            }
        }

        #[test]
        fn identical_embedding_scores_one(embedding in arb_embedding(DIM)) {
            prop_assume!(embedding.iter().map(|x| x * x).sum::<f32>() > 1e-3);
            prop_assert!((cosine_similarity(&embedding, &embedding) - 1.0).abs() < 1e-4);
        }
    }
}
