//! Deterministic model doubles shared by the integration tests.

#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use statute_rag::{ChatMessage, CompletionModel, EmbeddingProvider, RagError, Result};

/// Embeds text as term counts over a fixed vocabulary, plus a constant
/// component so no vector is all zeros.
pub struct KeywordEmbedder {
    vocabulary: Vec<&'static str>,
    fail_on: Option<&'static str>,
    failures_left: AtomicUsize,
    inputs: Mutex<Vec<String>>,
}

impl KeywordEmbedder {
    pub fn new(vocabulary: &[&'static str]) -> Self {
        Self {
            vocabulary: vocabulary.to_vec(),
            fail_on: None,
            failures_left: AtomicUsize::new(0),
            inputs: Mutex::new(Vec::new()),
        }
    }

    /// Fail every call whose text contains `marker`.
    pub fn failing_on(mut self, marker: &'static str) -> Self {
        self.fail_on = Some(marker);
        self
    }

    /// Fail the next `failures` calls, whatever their text.
    pub fn fail_next(&self, failures: usize) {
        self.failures_left.store(failures, Ordering::SeqCst);
    }

    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().unwrap().clone()
    }

    pub fn vector(&self, text: &str) -> Vec<f32> {
        let mut v: Vec<f32> =
            self.vocabulary.iter().map(|term| text.matches(term).count() as f32).collect();
        v.push(0.1);
        v
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.inputs.lock().unwrap().push(text.to_string());
        let left = self.failures_left.load(Ordering::SeqCst);
        let scheduled = left > 0;
        if scheduled {
            self.failures_left.store(left - 1, Ordering::SeqCst);
        }
        if scheduled || self.fail_on.is_some_and(|marker| text.contains(marker)) {
            return Err(RagError::EmbeddingCallFailed {
                provider: "keyword".into(),
                message: "rate limited".into(),
            });
        }
        Ok(self.vector(text))
    }

    fn dimensions(&self) -> usize {
        self.vocabulary.len() + 1
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

/// Replies with a fixed answer after failing a given number of times, and
/// records every request.
pub struct ScriptedModel {
    reply: String,
    failures_left: AtomicUsize,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedModel {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            failures_left: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_first(self, failures: usize) -> Self {
        self.failures_left.store(failures, Ordering::SeqCst);
        self
    }

    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionModel for ScriptedModel {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        self.requests.lock().unwrap().push(messages.to_vec());
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(RagError::GenerationCallFailed {
                provider: "scripted".into(),
                message: "service unavailable".into(),
            });
        }
        Ok(self.reply.clone())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
