//! Retrieval service: load or index a statute, retrieve grounding context,
//! and ask the completion model.
//!
//! # Example
//!
//! ```rust,ignore
//! use statute_rag::{DirectorySource, EmbeddingStore, RagConfig, RetrievalService, Statute};
//!
//! let service = RetrievalService::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(embedder))
//!     .completion_model(Arc::new(chat_model))
//!     .source(Arc::new(DirectorySource::new("statutes")))
//!     .store(EmbeddingStore::new("artifacts"))
//!     .build()?;
//!
//! let labor = service.load_precomputed(Statute::Labor).await?;
//! let answer = service.ask(&labor, "试用期最长多久？").await?;
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::chunking::{Chunker, FixedSizeChunker};
use crate::config::{RagConfig, RetrievalConfig};
use crate::document::{Chunk, Document, ScoredChunk, Statute};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::{ChatMessage, CompletionModel};
use crate::ranker::rank;
use crate::source::DocumentSource;
use crate::store::{ArtifactKey, EmbeddingStore};

/// Separator written after every chunk of the grounding context.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

const REFERENCE_HEADING: &str = "Reference material:";
const QUESTION_HEADING: &str = "Question:";

/// A statute ready for retrieval: its text, the geometry it was chunked with,
/// and its chunks.
///
/// This value is the whole session state. Loading another statute produces a
/// new `LoadedDocument`; a failed load leaves the previous one untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedDocument {
    document: Document,
    config: RetrievalConfig,
    chunks: Vec<Chunk>,
}

impl LoadedDocument {
    pub fn new(document: Document, config: RetrievalConfig, chunks: Vec<Chunk>) -> Self {
        Self { document, config, chunks }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn statute(&self) -> Statute {
        self.document.statute()
    }

    pub fn config(&self) -> RetrievalConfig {
        self.config
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Number of chunks that carry an embedding.
    pub fn embedded_count(&self) -> usize {
        self.chunks.iter().filter(|c| c.embedding.is_some()).count()
    }

    /// Whether at least one chunk has an embedding of `dimensions` values.
    pub fn has_embeddings_of(&self, dimensions: usize) -> bool {
        self.chunks.iter().filter_map(|c| c.embedding.as_ref()).any(|e| e.len() == dimensions)
    }
}

/// Ranked chunks and the context built from them.
#[derive(Debug, Clone, PartialEq)]
pub struct Retrieval {
    /// Most relevant first.
    pub chunks: Vec<ScoredChunk>,
    /// Chunk texts in ranked order, each followed by [`CONTEXT_SEPARATOR`].
    pub context: String,
}

/// A generated answer with the retrieval that grounded it.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub text: String,
    pub retrieval: Retrieval,
}

/// Options for [`RetrievalService::index`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexOptions {
    /// Also write a summary for every chunk (needs a completion model).
    pub summarize: bool,
    /// Write the artifact to the store when every chunk was embedded.
    pub save: bool,
}

/// Result of [`RetrievalService::index`].
#[derive(Debug, Clone, PartialEq)]
pub struct IndexOutcome {
    pub loaded: LoadedDocument,
    /// Ids of chunks whose embedding call failed.
    pub failed_embeddings: Vec<usize>,
    /// Ids of chunks whose summary call failed.
    pub failed_summaries: Vec<usize>,
    /// Where the artifact was written, if it was.
    pub artifact: Option<PathBuf>,
}

/// Concatenate chunk texts in the given order, each followed by a blank line.
pub fn format_context(chunks: &[ScoredChunk]) -> String {
    chunks.iter().fold(String::new(), |mut context, scored| {
        context.push_str(&scored.chunk.text);
        context.push_str(CONTEXT_SEPARATOR);
        context
    })
}

/// Build the completion request: the system instruction, then one user
/// message holding the reference material followed by the question.
pub fn build_messages(system_instruction: &str, context: &str, query: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(system_instruction),
        ChatMessage::user(format!("{REFERENCE_HEADING}\n{context}{QUESTION_HEADING} {query}")),
    ]
}

/// Coordinates the document source, embedding store, ranker and models.
///
/// Construct one via [`RetrievalService::builder()`].
pub struct RetrievalService {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    completion_model: Option<Arc<dyn CompletionModel>>,
    source: Arc<dyn DocumentSource>,
    store: EmbeddingStore,
}

impl RetrievalService {
    /// Create a new [`RetrievalServiceBuilder`].
    pub fn builder() -> RetrievalServiceBuilder {
        RetrievalServiceBuilder::default()
    }

    /// Return a reference to the service configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the embedding store.
    pub fn store(&self) -> &EmbeddingStore {
        &self.store
    }

    /// Load `statute` with its precomputed artifact for the configured geometry.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::DocumentUnavailable`] if the text cannot be read,
    /// [`RagError::ConfigurationMismatch`] if the stored embeddings do not have
    /// the dimensionality of the configured embedding provider, and the errors
    /// of [`EmbeddingStore::load_for`] otherwise.
    pub async fn load_precomputed(&self, statute: Statute) -> Result<LoadedDocument> {
        let config = self.config.retrieval;
        let document = self.source.load(statute).await?;
        let chunks = self.store.load_for(&document, config).await?;

        let expected = self.embedding_provider.dimensions();
        let stored = chunks.iter().find_map(|c| c.embedding.as_ref()).map(Vec::len);
        if let Some(stored) = stored.filter(|&stored| stored != expected) {
            error!(%statute, stored, expected, "artifact dimensionality differs from provider");
            return Err(RagError::ConfigurationMismatch {
                statute: statute.to_string(),
                message: format!(
                    "artifact embeddings have {stored} dimensions but {} produces {expected}",
                    self.embedding_provider.name()
                ),
            });
        }
        info!(%statute, %config, chunk_count = chunks.len(), "statute loaded");
        Ok(LoadedDocument::new(document, config, chunks))
    }

    /// Load `statute`, chunk it and embed every chunk, pacing the calls.
    ///
    /// Embedding failures do not fail the call; they are reported in
    /// [`IndexOutcome::failed_embeddings`] and those chunks are not ranked. The
    /// artifact is only saved when no embedding failed.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfig`] if summaries are requested without a
    /// completion model, plus any error of reading or saving.
    pub async fn index(&self, statute: Statute, options: IndexOptions) -> Result<IndexOutcome> {
        let summarizer = match (&self.completion_model, options.summarize) {
            (Some(model), true) => Some(model.clone()),
            (None, true) => {
                return Err(RagError::InvalidConfig(
                    "chunk summaries need a completion model".to_string(),
                ));
            }
            (_, false) => None,
        };

        let config = self.config.retrieval;
        let document = self.source.load(statute).await?;
        let chunks = FixedSizeChunker::new(config).chunk(&document);
        info!(
            %statute,
            %config,
            chars = document.len(),
            chunk_count = chunks.len(),
            "statute chunked"
        );

        let report = EmbeddingStore::compute_embeddings(
            chunks,
            self.embedding_provider.as_ref(),
            self.config.embedding_pause,
        )
        .await;
        let failed_embeddings = report.failed;
        let mut chunks = report.chunks;

        let mut failed_summaries = Vec::new();
        if let Some(model) = summarizer {
            let report =
                EmbeddingStore::summarize_chunks(chunks, model.as_ref(), self.config.summary_pause)
                    .await;
            failed_summaries = report.failed;
            chunks = report.chunks;
        }

        let artifact = if !options.save {
            None
        } else if failed_embeddings.is_empty() {
            Some(self.store.save(&ArtifactKey::new(statute, config), &chunks).await?)
        } else {
            warn!(
                %statute,
                failed = failed_embeddings.len(),
                "artifact not saved, some chunks have no embedding"
            );
            None
        };

        Ok(IndexOutcome {
            loaded: LoadedDocument::new(document, config, chunks),
            failed_embeddings,
            failed_summaries,
            artifact,
        })
    }

    /// Embed `query`, rank the loaded chunks, and build the grounding context
    /// from the `top_n` best.
    ///
    /// `top_n == 0` gives an empty context, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingCallFailed`] if the query cannot be
    /// embedded within the retry policy, and [`RagError::ConfigurationMismatch`]
    /// if `top_n > 0` but no chunk has an embedding comparable with the query.
    pub async fn answer_query(
        &self,
        loaded: &LoadedDocument,
        query: &str,
        top_n: usize,
    ) -> Result<Retrieval> {
        let no_usable_chunks = |message: String| {
            error!(statute = %loaded.statute(), %message, "nothing to rank");
            RagError::ConfigurationMismatch { statute: loaded.statute().to_string(), message }
        };
        if top_n > 0 && loaded.embedded_count() == 0 {
            return Err(no_usable_chunks("no chunk has an embedding; index it again".into()));
        }

        let provider = self.embedding_provider.as_ref();
        let query_embedding =
            self.config.retry.run("embed_query", || provider.embed(query)).await.map_err(|e| {
                error!(error = %e, "embedding failed during query");
                e
            })?;

        let dimensions = query_embedding.len();
        if top_n > 0 && !loaded.has_embeddings_of(dimensions) {
            return Err(no_usable_chunks(format!(
                "no chunk embedding has the query's {dimensions} dimensions"
            )));
        }

        let chunks = rank(&query_embedding, loaded.chunks(), top_n);
        let context = format_context(&chunks);
        info!(
            statute = %loaded.statute(),
            top_n,
            result_count = chunks.len(),
            context_chars = context.chars().count(),
            "retrieval completed"
        );
        Ok(Retrieval { chunks, context })
    }

    /// Retrieve with the configured `top_n` and ask the completion model.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfig`] if no completion model is configured,
    /// the errors of [`answer_query`](Self::answer_query), and
    /// [`RagError::GenerationCallFailed`] once the retry policy is exhausted.
    pub async fn ask(&self, loaded: &LoadedDocument, query: &str) -> Result<Answer> {
        let model = self
            .completion_model
            .as_deref()
            .ok_or_else(|| RagError::InvalidConfig("no completion model configured".to_string()))?;

        let retrieval = self.answer_query(loaded, query, self.config.top_n).await?;
        let messages = build_messages(&self.config.system_instruction, &retrieval.context, query);

        let text = self.config.retry.run("complete", || model.complete(&messages)).await.map_err(
            |e| {
                error!(model = model.name(), error = %e, "generation failed");
                e
            },
        )?;

        info!(statute = %loaded.statute(), answer_chars = text.chars().count(), "answer generated");
        Ok(Answer { text, retrieval })
    }
}

/// Builder for constructing a [`RetrievalService`].
///
/// All fields except `completion_model` are required; `config` defaults to
/// [`RagConfig::default()`].
#[derive(Default)]
pub struct RetrievalServiceBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    completion_model: Option<Arc<dyn CompletionModel>>,
    source: Option<Arc<dyn DocumentSource>>,
    store: Option<EmbeddingStore>,
}

impl RetrievalServiceBuilder {
    /// Set the service configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the completion model used by [`RetrievalService::ask`] and for chunk summaries.
    pub fn completion_model(mut self, model: Arc<dyn CompletionModel>) -> Self {
        self.completion_model = Some(model);
        self
    }

    /// Set the statute text source.
    pub fn source(mut self, source: Arc<dyn DocumentSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Set the artifact store.
    pub fn store(mut self, store: EmbeddingStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Build the [`RetrievalService`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfig`] if any required field is missing.
    pub fn build(self) -> Result<RetrievalService> {
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::InvalidConfig("embedding_provider is required".to_string()))?;
        let source =
            self.source.ok_or_else(|| RagError::InvalidConfig("source is required".to_string()))?;
        let store =
            self.store.ok_or_else(|| RagError::InvalidConfig("store is required".to_string()))?;

        Ok(RetrievalService {
            config: self.config.unwrap_or_default(),
            embedding_provider,
            completion_model: self.completion_model,
            source,
            store,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(id: usize, text: &str) -> ScoredChunk {
        ScoredChunk { chunk: Chunk::new(id, text), similarity_score: 0.5 }
    }

    #[test]
    fn context_keeps_order_and_separates_chunks() {
        let context = format_context(&[scored(2, "第二条"), scored(0, "第一条")]);
        assert_eq!(context, "第二条\n\n第一条\n\n");
    }

    #[test]
    fn empty_selection_gives_empty_context() {
        assert_eq!(format_context(&[]), "");
    }

    #[test]
    fn messages_hold_instruction_context_and_question() {
        let messages = build_messages("be precise", "第一条\n\n", "试用期多久？");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], ChatMessage::system("be precise"));
        assert_eq!(messages[1].content, "Reference material:\n第一条\n\nQuestion: 试用期多久？");
    }
}
