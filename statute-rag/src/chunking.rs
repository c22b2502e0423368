//! Fixed-size windowing of statute texts.
//!
//! Windows are measured in characters, not bytes, so multi-byte text is never
//! cut inside a code point. Consecutive windows start `chunk_size -
//! overlap_size` characters apart and therefore share `overlap_size`
//! characters. Windowing stops at the first window that reaches the end of the
//! text, so no trailing window repeats characters its predecessor already holds.

use crate::config::RetrievalConfig;
use crate::document::{Chunk, Document};

/// A strategy for splitting documents into chunks.
///
/// Implementations produce [`Chunk`]s with text but no embeddings.
/// Embeddings are attached later by the embedding store.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has empty text.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Splits text into overlapping windows of a fixed character count.
///
/// # Example
///
/// ```rust
/// use statute_rag::{Chunker, Document, FixedSizeChunker, RetrievalConfig, Statute};
///
/// let chunker = FixedSizeChunker::new(RetrievalConfig::new(4, 2).unwrap());
/// let chunks = chunker.chunk(&Document::new(Statute::Labor, "ABCDEFGHIJ"));
/// let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
/// assert_eq!(texts, ["ABCD", "CDEF", "EFGH", "GHIJ"]);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FixedSizeChunker {
    config: RetrievalConfig,
}

impl FixedSizeChunker {
    /// Create a chunker for the given (already validated) geometry.
    pub fn new(config: RetrievalConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> RetrievalConfig {
        self.config
    }
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        split(document.text(), self.config)
    }
}

/// Split `text` into overlapping windows.
///
/// A text no longer than `chunk_size` yields exactly one chunk. The output is
/// a pure function of its inputs.
pub fn split(text: &str, config: RetrievalConfig) -> Vec<Chunk> {
    if text.is_empty() {
        return Vec::new();
    }

    // Byte offset of every character boundary, including the end of the text.
    let bounds: Vec<usize> =
        text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();
    let char_count = bounds.len() - 1;

    let chunk_size = config.chunk_size();
    let step = config.step();

    let mut chunks = Vec::with_capacity(char_count / step + 1);
    let mut start = 0;
    loop {
        let end = (start + chunk_size).min(char_count);
        chunks.push(Chunk::new(chunks.len(), &text[bounds[start]..bounds[end]]));
        if end == char_count {
            break;
        }
        start += step;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(chunks: &[Chunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks = split("ABC", RetrievalConfig::new(4, 2).unwrap());
        assert_eq!(texts(&chunks), ["ABC"]);
        assert_eq!(chunks[0].id, 0);

        let exact = split("ABCD", RetrievalConfig::new(4, 2).unwrap());
        assert_eq!(texts(&exact), ["ABCD"]);
    }

    #[test]
    fn final_window_may_be_shorter() {
        let chunks = split("ABCDEFGHIJK", RetrievalConfig::new(4, 2).unwrap());
        assert_eq!(texts(&chunks), ["ABCD", "CDEF", "EFGH", "GHIJ", "IJK"]);
    }

    #[test]
    fn zero_overlap_tiles_the_text() {
        let chunks = split("ABCDEFG", RetrievalConfig::new(3, 0).unwrap());
        assert_eq!(texts(&chunks), ["ABC", "DEF", "G"]);
    }

    #[test]
    fn counts_characters_not_bytes() {
        let chunks = split("劳动者享有平等就业", RetrievalConfig::new(4, 1).unwrap());
        assert_eq!(texts(&chunks), ["劳动者享", "享有平等", "等就业"]);
    }

    #[test]
    fn empty_text_yields_nothing() {
        assert!(split("", RetrievalConfig::STANDARD).is_empty());
    }
}
