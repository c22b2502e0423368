//! Cosine-similarity ranking of chunks against a query embedding.

use std::cmp::Ordering;

use tracing::debug;

use crate::document::{Chunk, ScoredChunk};

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude. Vectors of different length
/// are compared over their common prefix; [`rank`] never does that.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Return the `top_n` chunks most similar to `query`.
///
/// Results are ordered by descending similarity, ties by ascending chunk id.
/// Chunks without an embedding, or whose embedding has a different
/// dimensionality than `query`, are skipped. The input is not modified.
pub fn rank(query: &[f32], chunks: &[Chunk], top_n: usize) -> Vec<ScoredChunk> {
    if top_n == 0 {
        return Vec::new();
    }

    let mut skipped = 0usize;
    let mut scored: Vec<ScoredChunk> = chunks
        .iter()
        .filter_map(|chunk| match chunk.embedding.as_deref() {
            Some(embedding) if embedding.len() == query.len() => Some(ScoredChunk {
                chunk: chunk.clone(),
                similarity_score: cosine_similarity(query, embedding),
            }),
            _ => {
                skipped += 1;
                None
            }
        })
        .collect();

    if skipped > 0 {
        debug!(skipped, "chunks without a usable embedding excluded from ranking");
    }

    scored.sort_by(|a, b| {
        b.similarity_score
            .partial_cmp(&a.similarity_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.chunk.id.cmp(&b.chunk.id))
    });
    scored.truncate(top_n);
    scored
}

/// Ranks chunks for a fixed result count.
#[derive(Debug, Clone, Copy)]
pub struct SimilarityRanker {
    top_n: usize,
}

impl SimilarityRanker {
    pub fn new(top_n: usize) -> Self {
        Self { top_n }
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    /// See [`rank`].
    pub fn rank(&self, query: &[f32], chunks: &[Chunk]) -> Vec<ScoredChunk> {
        rank(query, chunks, self.top_n)
    }
}
