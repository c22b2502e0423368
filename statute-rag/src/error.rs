//! Error types for the `statute-rag` crate.

use thiserror::Error;

/// Errors that can occur while loading, indexing or querying a statute.
#[derive(Debug, Error)]
pub enum RagError {
    /// The requested chunk geometry has no matching precomputed artifact, or the
    /// artifact on disk was built with a different geometry.
    #[error("Configuration mismatch for '{statute}': {message}")]
    ConfigurationMismatch {
        /// The statute the artifact belongs to.
        statute: String,
        /// A description of the disagreement.
        message: String,
    },

    /// An embedding artifact is missing or corrupt.
    #[error("Embedding store unavailable ({path}): {message}")]
    StoreUnavailable {
        /// Path of the artifact that could not be used.
        path: String,
        /// A description of the failure.
        message: String,
    },

    /// A single embedding request failed.
    #[error("Embedding call failed ({provider}): {message}")]
    EmbeddingCallFailed {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The completion request failed.
    #[error("Generation call failed ({provider}): {message}")]
    GenerationCallFailed {
        /// The completion model that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A statute text could not be read.
    #[error("Document '{statute}' unavailable: {message}")]
    DocumentUnavailable {
        /// The statute that was requested.
        statute: String,
        /// A description of the failure.
        message: String,
    },

    /// A statute name did not match any known statute.
    #[error("Unknown statute: {0}")]
    UnknownStatute(String),

    /// A configuration validation error.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl RagError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, RagError::EmbeddingCallFailed { .. } | RagError::GenerationCallFailed { .. })
    }
}

/// A convenience result type for retrieval operations.
pub type Result<T> = std::result::Result<T, RagError>;
