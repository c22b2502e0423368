//! The completion side of the model service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Author of a [`ChatMessage`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message of a chat-style completion request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
}

/// A language model that answers a list of chat messages with text.
///
/// Failures are reported as
/// [`RagError::GenerationCallFailed`](crate::RagError::GenerationCallFailed)
/// and are never masked; callers decide whether to retry.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Produce the assistant reply to `messages`.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;

    /// Name used in logs and error messages.
    fn name(&self) -> &str {
        "completion"
    }
}
