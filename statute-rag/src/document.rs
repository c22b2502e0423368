//! Data types for statutes, chunks, and ranked results.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RagError;

/// Character stripped from statute texts on load (U+3000, ideographic space).
pub const IDEOGRAPHIC_SPACE: char = '\u{3000}';

/// One of the statutes the system can answer questions about.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Statute {
    /// Company Law of the People's Republic of China.
    Company,
    /// Labor Law of the People's Republic of China.
    Labor,
    /// Marriage Law of the People's Republic of China.
    Marriage,
}

impl Statute {
    pub const ALL: [Statute; 3] = [Statute::Company, Statute::Labor, Statute::Marriage];

    /// Short identifier used for file names.
    pub fn slug(&self) -> &'static str {
        match self {
            Statute::Company => "company",
            Statute::Labor => "labor",
            Statute::Marriage => "marriage",
        }
    }

    /// Name shown to users.
    pub fn display_name(&self) -> &'static str {
        match self {
            Statute::Company => "公司法",
            Statute::Labor => "劳动法",
            Statute::Marriage => "婚姻法",
        }
    }
}

impl fmt::Display for Statute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Statute {
    type Err = RagError;

    /// Accepts either the slug (`labor`) or the display name (`劳动法`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Statute::ALL
            .into_iter()
            .find(|statute| statute.slug().eq_ignore_ascii_case(s) || statute.display_name() == s)
            .ok_or_else(|| RagError::UnknownStatute(s.to_string()))
    }
}

/// A loaded statute with its normalized body text.
///
/// The text is fixed once constructed; loading another statute produces a new
/// `Document`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    statute: Statute,
    text: String,
}

impl Document {
    /// Build a document from raw file contents, stripping ideographic spaces.
    pub fn new(statute: Statute, raw: &str) -> Self {
        Self { statute, text: raw.replace(IDEOGRAPHIC_SPACE, "") }
    }

    pub fn statute(&self) -> Statute {
        self.statute
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Length of the body in characters.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// A window of a [`Document`], optionally carrying its embedding.
///
/// This is also the record format of embedding artifacts on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Zero-based position in windowing order.
    pub id: usize,
    /// The text content of the chunk.
    pub text: String,
    /// The vector embedding, absent until computed or loaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    /// Model-written summary of the chunk.
    #[serde(rename = "abstract", default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl Chunk {
    /// Create a chunk without an embedding.
    pub fn new(id: usize, text: impl Into<String>) -> Self {
        Self { id, text: text.into(), embedding: None, summary: None }
    }

    /// Attach an embedding.
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

/// A [`Chunk`] paired with its similarity to a query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredChunk {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// Cosine similarity in `[-1, 1]` (higher is more relevant).
    pub similarity_score: f32,
}
