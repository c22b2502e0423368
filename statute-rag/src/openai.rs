//! OpenAI-compatible embedding and chat completion clients.
//!
//! This module is only available when the `openai` feature is enabled.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::{ChatMessage, CompletionModel};

/// The default OpenAI API base URL.
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// The default model for embeddings.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";

/// The dimensionality of `text-embedding-ada-002`.
pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 1536;

/// The default model for chat completions.
pub const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const PROVIDER: &str = "OpenAI";

/// Authenticated HTTP access to an OpenAI-compatible API.
///
/// Shared by [`OpenAIEmbeddingProvider`] and [`OpenAIChatModel`].
#[derive(Clone)]
pub struct OpenAIClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAIClient {
    /// Create a client for the public OpenAI API.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RagError::InvalidConfig("OpenAI API key must not be empty".into()));
        }
        Ok(Self { http: build_http(DEFAULT_TIMEOUT)?, api_key, base_url: OPENAI_API_BASE.into() })
    }

    /// Create a client using the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            RagError::InvalidConfig("OPENAI_API_KEY environment variable not set".into())
        })?;
        Self::new(api_key)
    }

    /// Point the client at another OpenAI-compatible endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.http = build_http(timeout)?;
        Ok(self)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST `body` to `{base_url}{path}` and decode the JSON reply. Failures
    /// are turned into errors by `fail`.
    async fn post<B, R>(&self, path: &str, body: &B, fail: fn(String) -> RagError) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned + Send,
    {
        let url = format!("{}{path}", self.base_url);
        let response =
            self.http.post(&url).bearer_auth(&self.api_key).json(body).send().await.map_err(
                |e| {
                    error!(provider = PROVIDER, %url, error = %e, "request failed");
                    fail(format!("request failed: {e}"))
                },
            )?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);

            error!(provider = PROVIDER, %url, %status, "API error");
            return Err(fail(format!("API returned {status}: {detail}")));
        }

        response.json().await.map_err(|e| {
            error!(provider = PROVIDER, %url, error = %e, "failed to parse response");
            fail(format!("failed to parse response: {e}"))
        })
    }
}

fn build_http(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| RagError::InvalidConfig(format!("cannot build HTTP client: {e}")))
}

fn embedding_failed(message: String) -> RagError {
    RagError::EmbeddingCallFailed { provider: PROVIDER.into(), message }
}

fn generation_failed(message: String) -> RagError {
    RagError::GenerationCallFailed { provider: PROVIDER.into(), message }
}

// ── OpenAI API request/response types ──────────────────────────────

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

// ── EmbeddingProvider implementation ───────────────────────────────

/// An [`EmbeddingProvider`] backed by the `/embeddings` endpoint.
///
/// # Example
///
/// ```rust,ignore
/// use statute_rag::openai::{OpenAIClient, OpenAIEmbeddingProvider};
///
/// let provider = OpenAIEmbeddingProvider::new(OpenAIClient::from_env()?);
/// let embedding = provider.embed("劳动合同").await?;
/// ```
#[derive(Clone)]
pub struct OpenAIEmbeddingProvider {
    client: OpenAIClient,
    model: String,
    dimensions: usize,
}

impl OpenAIEmbeddingProvider {
    /// Uses `text-embedding-ada-002` (1536 dimensions).
    pub fn new(client: OpenAIClient) -> Self {
        Self {
            client,
            model: DEFAULT_EMBEDDING_MODEL.into(),
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }

    /// Set the model name and the dimensionality it produces.
    pub fn with_model(mut self, model: impl Into<String>, dimensions: usize) -> Self {
        self.model = model.into();
        self.dimensions = dimensions;
        self
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, model = %self.model, text_len = text.len(), "embedding text");

        let request = EmbeddingRequest { model: &self.model, input: [text] };
        let response: EmbeddingResponse =
            self.client.post("/embeddings", &request, embedding_failed).await?;

        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| embedding_failed("API returned empty response".into()))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        &self.model
    }
}

// ── CompletionModel implementation ─────────────────────────────────

/// A [`CompletionModel`] backed by the `/chat/completions` endpoint.
#[derive(Clone)]
pub struct OpenAIChatModel {
    client: OpenAIClient,
    model: String,
    temperature: Option<f32>,
}

impl OpenAIChatModel {
    /// Uses `gpt-3.5-turbo` with the API's default temperature.
    pub fn new(client: OpenAIClient) -> Self {
        Self { client, model: DEFAULT_CHAT_MODEL.into(), temperature: None }
    }

    /// Set the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

#[async_trait]
impl CompletionModel for OpenAIChatModel {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        debug!(
            provider = PROVIDER,
            model = %self.model,
            message_count = messages.len(),
            "chat completion"
        );

        let request =
            ChatRequest { model: &self.model, messages, temperature: self.temperature };
        let response: ChatResponse =
            self.client.post("/chat/completions", &request, generation_failed).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| generation_failed("API returned no message content".into()))
    }

    fn name(&self) -> &str {
        &self.model
    }
}
