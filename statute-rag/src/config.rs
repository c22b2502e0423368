//! Configuration for chunk geometry and the retrieval service.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};
use crate::retry::RetryPolicy;

/// Default instruction sent as the system message of every completion request.
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are a legal assistant. Answer the user's \
question using only the reference material taken from the statute. If the reference material \
does not cover the question, say so instead of guessing.";

/// Chunk geometry: window size and the overlap between consecutive windows.
///
/// Both values are measured in characters. The pair also identifies which
/// precomputed embedding artifact belongs to a statute.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RetrievalConfig {
    chunk_size: usize,
    overlap_size: usize,
}

impl RetrievalConfig {
    /// 300-character windows with a 100-character overlap.
    pub const STANDARD: RetrievalConfig = RetrievalConfig { chunk_size: 300, overlap_size: 100 };

    /// 500-character windows with a 100-character overlap.
    pub const WIDE: RetrievalConfig = RetrievalConfig { chunk_size: 500, overlap_size: 100 };

    /// Create a validated geometry.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfig`] if `chunk_size == 0` or
    /// `overlap_size >= chunk_size`.
    pub fn new(chunk_size: usize, overlap_size: usize) -> Result<Self> {
        let config = Self { chunk_size, overlap_size };
        config.validate()?;
        Ok(config)
    }

    /// Check the geometry invariants. Useful after deserializing.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RagError::InvalidConfig("chunk_size must be greater than zero".into()));
        }
        if self.overlap_size >= self.chunk_size {
            return Err(RagError::InvalidConfig(format!(
                "overlap_size ({}) must be less than chunk_size ({})",
                self.overlap_size, self.chunk_size
            )));
        }
        Ok(())
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap_size(&self) -> usize {
        self.overlap_size
    }

    /// Distance between the starts of two consecutive windows.
    pub fn step(&self) -> usize {
        self.chunk_size - self.overlap_size
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self::STANDARD
    }
}

impl std::fmt::Display for RetrievalConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.chunk_size, self.overlap_size)
    }
}

/// Configuration parameters for the retrieval service.
#[derive(Debug, Clone, PartialEq)]
pub struct RagConfig {
    /// Chunk geometry used for indexing and artifact lookup.
    pub retrieval: RetrievalConfig,
    /// Number of chunks handed to the model as grounding context.
    pub top_n: usize,
    /// Pause after every embedding call of a batch.
    pub embedding_pause: Duration,
    /// Pause after every summarization call of a batch.
    pub summary_pause: Duration,
    /// System message of the completion request.
    pub system_instruction: String,
    /// Retry policy for the query embedding and the completion call.
    pub retry: RetryPolicy,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            retrieval: RetrievalConfig::default(),
            top_n: 3,
            embedding_pause: Duration::from_secs(1),
            summary_pause: Duration::from_secs(15),
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the chunk geometry.
    pub fn retrieval(mut self, retrieval: RetrievalConfig) -> Self {
        self.config.retrieval = retrieval;
        self
    }

    /// Set the number of chunks used as grounding context.
    pub fn top_n(mut self, top_n: usize) -> Self {
        self.config.top_n = top_n;
        self
    }

    /// Set the pause after each embedding call during batch indexing.
    pub fn embedding_pause(mut self, pause: Duration) -> Self {
        self.config.embedding_pause = pause;
        self
    }

    /// Set the pause after each summarization call.
    pub fn summary_pause(mut self, pause: Duration) -> Self {
        self.config.summary_pause = pause;
        self
    }

    /// Replace the system instruction.
    pub fn system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.config.system_instruction = instruction.into();
        self
    }

    /// Set the retry policy for network calls made while answering.
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.config.retry = retry;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfig`] if:
    /// - the chunk geometry is invalid
    /// - `top_n == 0`
    /// - the retry policy allows no attempt
    pub fn build(self) -> Result<RagConfig> {
        self.config.retrieval.validate()?;
        if self.config.top_n == 0 {
            return Err(RagError::InvalidConfig("top_n must be greater than zero".to_string()));
        }
        if self.config.retry.max_attempts == 0 {
            return Err(RagError::InvalidConfig(
                "retry.max_attempts must be greater than zero".to_string(),
            ));
        }
        Ok(self.config)
    }
}
