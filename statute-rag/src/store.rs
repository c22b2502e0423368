//! Embedding artifacts: computing, saving, loading and checking them.
//!
//! An artifact is a JSON array of chunk records (`{id, text, embedding,
//! abstract?}`) for one statute at one chunk geometry. Artifacts live in a
//! single directory and are named `{statute}_embedding_{chunk_size}_{overlap_size}.json`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::chunking::split;
use crate::config::RetrievalConfig;
use crate::document::{Chunk, Document, Statute};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::{ChatMessage, CompletionModel};

/// Instruction used when summarizing chunks.
pub const SUMMARY_INSTRUCTION: &str = "Summarize the text provided by the user.";

/// Identity of an artifact: which statute, chunked how.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArtifactKey {
    pub statute: Statute,
    pub config: RetrievalConfig,
}

impl ArtifactKey {
    pub fn new(statute: Statute, config: RetrievalConfig) -> Self {
        Self { statute, config }
    }

    /// File name of the artifact inside the store directory.
    pub fn file_name(&self) -> String {
        format!(
            "{}_embedding_{}_{}.json",
            self.statute.slug(),
            self.config.chunk_size(),
            self.config.overlap_size()
        )
    }

    /// Inverse of [`file_name`](Self::file_name). Returns `None` for files that
    /// are not artifacts.
    pub fn parse_file_name(name: &str) -> Option<Self> {
        let stem = name.strip_suffix(".json")?;
        let (slug, geometry) = stem.split_once("_embedding_")?;
        let (chunk_size, overlap_size) = geometry.split_once('_')?;
        let statute = Statute::ALL.into_iter().find(|s| s.slug() == slug)?;
        let config =
            RetrievalConfig::new(chunk_size.parse().ok()?, overlap_size.parse().ok()?).ok()?;
        Some(Self { statute, config })
    }
}

/// Outcome of a paced batch over chunks.
///
/// Failed calls do not abort the batch; their chunk ids are collected here.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    /// All chunks, in their original order.
    pub chunks: Vec<Chunk>,
    /// Ids of the chunks whose call failed.
    pub failed: Vec<usize>,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Directory of embedding artifacts.
#[derive(Debug, Clone)]
pub struct EmbeddingStore {
    root: PathBuf,
}

impl EmbeddingStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the artifact for `key`.
    pub fn path_for(&self, key: &ArtifactKey) -> PathBuf {
        self.root.join(key.file_name())
    }

    /// Chunk geometries for which an artifact of `statute` exists, sorted.
    ///
    /// A missing store directory is treated as empty.
    pub async fn available(&self, statute: Statute) -> Result<Vec<RetrievalConfig>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(unavailable(&self.root, format!("cannot list store: {e}"))),
        };

        let mut configs = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| unavailable(&self.root, format!("cannot list store: {e}")))?
        {
            let name = entry.file_name();
            if let Some(key) = name.to_str().and_then(ArtifactKey::parse_file_name) {
                if key.statute == statute {
                    configs.push(key.config);
                }
            }
        }
        configs.sort_by_key(|c| (c.chunk_size(), c.overlap_size()));
        Ok(configs)
    }

    /// Load the artifact for `key` without checking it against a document.
    pub async fn load(&self, key: &ArtifactKey) -> Result<Vec<Chunk>> {
        load_artifact(self.path_for(key)).await
    }

    /// Write the artifact for `key`.
    pub async fn save(&self, key: &ArtifactKey, chunks: &[Chunk]) -> Result<PathBuf> {
        let path = self.path_for(key);
        save_artifact(&path, chunks).await?;
        Ok(path)
    }

    /// Load the artifact matching `document` chunked with `config`, and verify
    /// that it was really built that way.
    ///
    /// # Errors
    ///
    /// - [`RagError::ConfigurationMismatch`] if no artifact exists for `config`
    ///   while artifacts for other geometries do, or if the stored chunks differ
    ///   from the document chunked with `config`.
    /// - [`RagError::StoreUnavailable`] if there is no artifact for the statute
    ///   at all, or it is corrupt.
    pub async fn load_for(
        &self,
        document: &Document,
        config: RetrievalConfig,
    ) -> Result<Vec<Chunk>> {
        let statute = document.statute();
        let key = ArtifactKey::new(statute, config);
        let path = self.path_for(&key);

        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            let available = self.available(statute).await?;
            if !available.is_empty() {
                let listed: Vec<String> = available.iter().map(|c| c.to_string()).collect();
                error!(
                    %statute,
                    %config,
                    available = %listed.join(", "),
                    "no artifact for geometry"
                );
                return Err(RagError::ConfigurationMismatch {
                    statute: statute.to_string(),
                    message: format!(
                        "no artifact for chunk geometry {config}; available: {}",
                        listed.join(", ")
                    ),
                });
            }
        }

        let chunks = check_geometry(document, config, load_artifact(&path).await?)?;
        info!(%statute, %config, chunk_count = chunks.len(), "loaded embedding artifact");
        Ok(chunks)
    }

    /// Attach an embedding to every chunk, one call at a time.
    ///
    /// Each call is followed by `pause`. Newlines are replaced by spaces before
    /// a chunk is embedded; the stored text is left untouched. A failed call is
    /// logged, leaves that chunk without an embedding, and the batch goes on.
    pub async fn compute_embeddings(
        mut chunks: Vec<Chunk>,
        provider: &dyn EmbeddingProvider,
        pause: Duration,
    ) -> BatchReport {
        info!(provider = provider.name(), chunk_count = chunks.len(), "embedding chunks");
        let mut failed = Vec::new();

        for chunk in &mut chunks {
            let input = chunk.text.replace('\n', " ");
            match provider.embed(&input).await {
                Ok(embedding) => {
                    debug!(chunk.id = chunk.id, dimensions = embedding.len(), "chunk embedded");
                    chunk.embedding = Some(embedding);
                }
                Err(e) => {
                    warn!(
                        chunk.id = chunk.id,
                        error = %e,
                        "embedding call failed, chunk left unembedded"
                    );
                    chunk.embedding = None;
                    failed.push(chunk.id);
                }
            }
            tokio::time::sleep(pause).await;
        }

        info!(failed = failed.len(), "chunk embedding finished");
        BatchReport { chunks, failed }
    }

    /// Ask `model` for a summary of every chunk, one call at a time.
    ///
    /// Pacing and failure handling are the same as for
    /// [`compute_embeddings`](Self::compute_embeddings).
    pub async fn summarize_chunks(
        mut chunks: Vec<Chunk>,
        model: &dyn CompletionModel,
        pause: Duration,
    ) -> BatchReport {
        info!(model = model.name(), chunk_count = chunks.len(), "summarizing chunks");
        let mut failed = Vec::new();

        for chunk in &mut chunks {
            let messages =
                [ChatMessage::system(SUMMARY_INSTRUCTION), ChatMessage::user(chunk.text.clone())];
            match model.complete(&messages).await {
                Ok(summary) => chunk.summary = Some(summary),
                Err(e) => {
                    warn!(chunk.id = chunk.id, error = %e, "summary call failed");
                    failed.push(chunk.id);
                }
            }
            tokio::time::sleep(pause).await;
        }

        info!(failed = failed.len(), "chunk summaries finished");
        BatchReport { chunks, failed }
    }
}

/// Read an artifact from `path`.
///
/// # Errors
///
/// Returns [`RagError::StoreUnavailable`] if the file is missing or unreadable,
/// is not a JSON array of chunk records, has ids out of sequence, or has a
/// record without an embedding or with a differing dimensionality.
pub async fn load_artifact(path: impl AsRef<Path>) -> Result<Vec<Chunk>> {
    let path = path.as_ref();
    let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
        error!(path = %path.display(), error = %e, "cannot read artifact");
        unavailable(path, format!("cannot read artifact: {e}"))
    })?;

    let chunks: Vec<Chunk> = serde_json::from_str(&raw).map_err(|e| {
        error!(path = %path.display(), error = %e, "malformed artifact");
        unavailable(path, format!("malformed artifact: {e}"))
    })?;

    let mut dimensions = None;
    for (position, chunk) in chunks.iter().enumerate() {
        if chunk.id != position {
            return Err(unavailable(
                path,
                format!("chunk at position {position} has id {}", chunk.id),
            ));
        }
        let embedding = chunk.embedding.as_ref().ok_or_else(|| {
            unavailable(path, format!("chunk {} has no embedding", chunk.id))
        })?;
        match dimensions {
            None if embedding.is_empty() => {
                return Err(unavailable(path, format!("chunk {} has an empty embedding", chunk.id)));
            }
            None => dimensions = Some(embedding.len()),
            Some(expected) if expected != embedding.len() => {
                return Err(unavailable(
                    path,
                    format!(
                        "chunk {} has {} dimensions, expected {expected}",
                        chunk.id,
                        embedding.len()
                    ),
                ));
            }
            Some(_) => {}
        }
    }

    Ok(chunks)
}

/// Write chunks as an artifact, creating parent directories.
///
/// Chunks without an embedding are written as they are; such an artifact will
/// not load until it is completed.
pub async fn save_artifact(path: impl AsRef<Path>, chunks: &[Chunk]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| unavailable(path, format!("cannot create store directory: {e}")))?;
    }
    let json = serde_json::to_string(chunks)
        .map_err(|e| unavailable(path, format!("cannot serialize chunks: {e}")))?;
    // Write then rename so readers never see a half-written artifact.
    let temp_path = path.with_extension("json.tmp");
    tokio::fs::write(&temp_path, json)
        .await
        .map_err(|e| unavailable(path, format!("cannot write artifact: {e}")))?;
    tokio::fs::rename(&temp_path, path)
        .await
        .map_err(|e| unavailable(path, format!("cannot move artifact into place: {e}")))?;
    info!(path = %path.display(), chunk_count = chunks.len(), "saved embedding artifact");
    Ok(())
}

/// Compare stored chunks with `document` chunked at `config`.
///
/// Some writers emit `(len - overlap) / step + 1` windows, which adds one
/// trailing window made only of its predecessor's last `overlap` characters.
/// Such a window is dropped before comparing.
fn check_geometry(
    document: &Document,
    config: RetrievalConfig,
    mut chunks: Vec<Chunk>,
) -> Result<Vec<Chunk>> {
    let mismatch = |message: String| {
        error!(
            statute = %document.statute(),
            %config,
            %message,
            "artifact does not match document"
        );
        RagError::ConfigurationMismatch { statute: document.statute().to_string(), message }
    };

    let expected = split(document.text(), config);
    if chunks.len() == expected.len() + 1 && has_redundant_tail(&chunks, config) {
        debug!(statute = %document.statute(), %config, "dropping redundant trailing chunk");
        chunks.pop();
    }
    if expected.len() != chunks.len() {
        return Err(mismatch(format!(
            "artifact holds {} chunks but chunking at {config} yields {}",
            chunks.len(),
            expected.len()
        )));
    }
    if let Some((stored, _)) = chunks.iter().zip(&expected).find(|(s, e)| s.text != e.text) {
        return Err(mismatch(format!(
            "chunk {} differs from the document chunked at {config}",
            stored.id
        )));
    }
    Ok(chunks)
}

/// Whether the last chunk is exactly the final `overlap` characters of the one
/// before it.
fn has_redundant_tail(chunks: &[Chunk], config: RetrievalConfig) -> bool {
    match chunks {
        [.., previous, last] => {
            last.text.chars().count() == config.overlap_size()
                && previous.text.ends_with(&last.text)
        }
        _ => false,
    }
}

fn unavailable(path: impl AsRef<Path>, message: String) -> RagError {
    RagError::StoreUnavailable { path: path.as_ref().display().to_string(), message }
}
