//! # statute-rag
//!
//! Retrieval over statutory texts for grounded legal question answering.
//!
//! A statute is split into overlapping fixed-size character windows, every
//! window is embedded once and stored as a JSON artifact, and at question time
//! the question is embedded and the most similar windows become the reference
//! material of a chat completion request.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`chunking`] | Overlapping fixed-size windows |
//! | [`store`] | Embedding artifacts: compute, save, load, check |
//! | [`ranker`] | Cosine-similarity top-N |
//! | [`service`] | Load/index a statute, retrieve, ask |
//! | [`openai`] | OpenAI-compatible clients (feature `openai`) |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use statute_rag::openai::{OpenAIChatModel, OpenAIClient, OpenAIEmbeddingProvider};
//! use statute_rag::{DirectorySource, EmbeddingStore, RetrievalService, Statute};
//!
//! let client = OpenAIClient::from_env()?;
//! let service = RetrievalService::builder()
//!     .embedding_provider(Arc::new(OpenAIEmbeddingProvider::new(client.clone())))
//!     .completion_model(Arc::new(OpenAIChatModel::new(client)))
//!     .source(Arc::new(DirectorySource::new("statutes")))
//!     .store(EmbeddingStore::new("artifacts"))
//!     .build()?;
//!
//! let labor = service.load_precomputed(Statute::Labor).await?;
//! let answer = service.ask(&labor, "用人单位可以延长工作时间吗？").await?;
//! println!("{}", answer.text);
//! ```

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod ranker;
pub mod retry;
pub mod service;
pub mod source;
pub mod store;

#[cfg(feature = "openai")]
pub mod openai;

pub use chunking::{Chunker, FixedSizeChunker, split};
pub use config::{RagConfig, RagConfigBuilder, RetrievalConfig};
pub use document::{Chunk, Document, ScoredChunk, Statute};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use generation::{ChatMessage, CompletionModel, Role};
pub use ranker::{SimilarityRanker, cosine_similarity, rank};
pub use retry::RetryPolicy;
pub use service::{
    Answer, IndexOptions, IndexOutcome, LoadedDocument, Retrieval, RetrievalService,
    RetrievalServiceBuilder, build_messages, format_context,
};
pub use source::{DirectorySource, DocumentSource};
pub use store::{ArtifactKey, BatchReport, EmbeddingStore, load_artifact, save_artifact};
