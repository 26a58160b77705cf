use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A single-prompt completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// The fully rendered prompt, sent as one user message.
    pub prompt: String,
    /// Sampling temperature.
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>, temperature: f32) -> Self {
        Self { prompt: prompt.into(), temperature }
    }
}

/// The text produced for a [`CompletionRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub text: String,
}

/// A hosted language model that turns a prompt into completion text.
///
/// Calls are awaited to completion; timeouts are the client's concern.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// The model identifier, used in logs and errors.
    fn name(&self) -> &str;

    /// Request a completion for the given prompt.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;
}
