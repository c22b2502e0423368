//! Where statute texts come from.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, error};

use crate::document::{Document, Statute};
use crate::error::{RagError, Result};

/// A source of raw statute texts.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Return the raw UTF-8 text of `statute`.
    async fn read_document(&self, statute: Statute) -> Result<String>;

    /// Read `statute` and normalize it into a [`Document`].
    async fn load(&self, statute: Statute) -> Result<Document> {
        let raw = self.read_document(statute).await?;
        let document = Document::new(statute, &raw);
        if document.is_empty() {
            return Err(RagError::DocumentUnavailable {
                statute: statute.to_string(),
                message: "document is empty".into(),
            });
        }
        Ok(document)
    }
}

/// Reads `{root}/{statute}.txt`.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, statute: Statute) -> PathBuf {
        self.root.join(format!("{}.txt", statute.slug()))
    }
}

#[async_trait]
impl DocumentSource for DirectorySource {
    async fn read_document(&self, statute: Statute) -> Result<String> {
        let path = self.path_for(statute);
        debug!(%statute, path = %path.display(), "reading statute");
        tokio::fs::read_to_string(&path).await.map_err(|e| {
            error!(%statute, path = %path.display(), error = %e, "cannot read statute");
            RagError::DocumentUnavailable {
                statute: statute.to_string(),
                message: format!("cannot read {}: {e}", path.display()),
            }
        })
    }
}
