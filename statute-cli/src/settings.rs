//! `statute.toml` settings: directories, chunk geometry, pacing and model
//! endpoints. Every key is optional.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use statute_rag::openai::{
    DEFAULT_CHAT_MODEL, DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_EMBEDDING_MODEL, OPENAI_API_BASE,
};
use statute_rag::{RagConfig, RetrievalConfig};

/// File read when `--config` is not given, if it exists.
pub const DEFAULT_SETTINGS_FILE: &str = "statute.toml";

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Settings {
    #[serde(default = "default_documents_dir")]
    pub documents_dir: PathBuf,
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: PathBuf,
    #[serde(default)]
    pub retrieval: RetrievalSettings,
    #[serde(default)]
    pub openai: OpenAISettings,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RetrievalSettings {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default = "default_embedding_pause_ms")]
    pub embedding_pause_ms: u64,
    #[serde(default = "default_summary_pause_ms")]
    pub summary_pause_ms: u64,
    #[serde(default)]
    pub system_instruction: Option<String>,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
            top_n: default_top_n(),
            embedding_pause_ms: default_embedding_pause_ms(),
            summary_pause_ms: default_summary_pause_ms(),
            system_instruction: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct OpenAISettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: usize,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OpenAISettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            embedding_model: default_embedding_model(),
            embedding_dimensions: default_embedding_dimensions(),
            chat_model: default_chat_model(),
            temperature: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_documents_dir() -> PathBuf {
    PathBuf::from("statutes")
}
fn default_artifacts_dir() -> PathBuf {
    PathBuf::from("artifacts")
}
fn default_chunk_size() -> usize {
    RetrievalConfig::STANDARD.chunk_size()
}
fn default_overlap() -> usize {
    RetrievalConfig::STANDARD.overlap_size()
}
fn default_top_n() -> usize {
    3
}
fn default_embedding_pause_ms() -> u64 {
    1_000
}
fn default_summary_pause_ms() -> u64 {
    15_000
}
fn default_base_url() -> String {
    OPENAI_API_BASE.to_string()
}
fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}
fn default_embedding_dimensions() -> usize {
    DEFAULT_EMBEDDING_DIMENSIONS
}
fn default_chat_model() -> String {
    DEFAULT_CHAT_MODEL.to_string()
}
fn default_timeout_secs() -> u64 {
    60
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            documents_dir: default_documents_dir(),
            artifacts_dir: default_artifacts_dir(),
            retrieval: RetrievalSettings::default(),
            openai: OpenAISettings::default(),
        }
    }
}

impl Settings {
    /// Parse settings from TOML text. Missing keys take their defaults.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse settings")
    }

    /// Load settings from `path`, or from [`DEFAULT_SETTINGS_FILE`] when it
    /// exists, or fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let fallback = PathBuf::from(DEFAULT_SETTINGS_FILE);
                if !fallback.exists() {
                    return Ok(Self::default());
                }
                fallback
            }
        };

        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("Invalid settings in {}", path.display()))
    }

    /// Geometry from the file, overridden by command-line flags.
    pub fn retrieval_config(
        &self,
        chunk_size: Option<usize>,
        overlap: Option<usize>,
    ) -> Result<RetrievalConfig> {
        let config = RetrievalConfig::new(
            chunk_size.unwrap_or(self.retrieval.chunk_size),
            overlap.unwrap_or(self.retrieval.overlap),
        )?;
        Ok(config)
    }

    pub fn rag_config(
        &self,
        retrieval: RetrievalConfig,
        top_n: Option<usize>,
    ) -> Result<RagConfig> {
        let mut builder = RagConfig::builder()
            .retrieval(retrieval)
            .top_n(top_n.unwrap_or(self.retrieval.top_n))
            .embedding_pause(Duration::from_millis(self.retrieval.embedding_pause_ms))
            .summary_pause(Duration::from_millis(self.retrieval.summary_pause_ms));
        if let Some(instruction) = &self.retrieval.system_instruction {
            builder = builder.system_instruction(instruction.clone());
        }
        Ok(builder.build()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.retrieval.chunk_size, 300);
        assert_eq!(settings.retrieval.overlap, 100);
        assert_eq!(settings.openai.chat_model, "gpt-3.5-turbo");
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let settings = Settings::from_toml(
            r#"
            documents_dir = "/srv/laws"

            [retrieval]
            chunk_size = 500
            summary_pause_ms = 0

            [openai]
            base_url = "http://localhost:8080/v1"
            "#,
        )
        .unwrap();

        assert_eq!(settings.documents_dir, PathBuf::from("/srv/laws"));
        assert_eq!(settings.artifacts_dir, PathBuf::from("artifacts"));
        assert_eq!(settings.retrieval.chunk_size, 500);
        assert_eq!(settings.retrieval.overlap, 100);
        assert_eq!(settings.retrieval.summary_pause_ms, 0);
        assert_eq!(settings.openai.base_url, "http://localhost:8080/v1");
        assert_eq!(settings.openai.embedding_model, "text-embedding-ada-002");
    }

    #[test]
    fn flags_override_file_geometry() {
        let settings = Settings::default();
        let config = settings.retrieval_config(Some(500), None).unwrap();
        assert_eq!(config, RetrievalConfig::WIDE);
        assert!(settings.retrieval_config(Some(100), Some(100)).is_err());
    }

    #[test]
    fn rag_config_carries_settings() {
        let mut settings = Settings::default();
        settings.retrieval.system_instruction = Some("只依据法条回答。".into());
        let config = settings.rag_config(RetrievalConfig::STANDARD, Some(5)).unwrap();
        assert_eq!(config.top_n, 5);
        assert_eq!(config.system_instruction, "只依据法条回答。");
        assert_eq!(config.embedding_pause, Duration::from_secs(1));
    }

    #[test]
    fn load_reads_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("statute.toml");
        std::fs::write(&path, "[retrieval]\ntop_n = 7\n").unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.retrieval.top_n, 7);

        assert!(Settings::load(Some(&dir.path().join("missing.toml"))).is_err());
    }
}
