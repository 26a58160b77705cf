//! Scripted [`LanguageModel`] for tests.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{ModelError, Result};
use crate::model::{CompletionRequest, CompletionResponse, LanguageModel};

/// A [`LanguageModel`] that replays queued responses and records every request.
///
/// When the queue is empty it falls back to the default reply set with
/// [`MockModel::with_default_reply`], or fails with [`ModelError::EmptyResponse`].
///
/// # Example
///
/// ```rust,ignore
/// use docqa_model::MockModel;
///
/// let model = MockModel::new("mock").with_response("I don't know.");
/// ```
#[derive(Debug)]
pub struct MockModel {
    name: String,
    responses: Mutex<VecDeque<Result<String>>>,
    default_reply: Option<String>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            responses: Mutex::new(VecDeque::new()),
            default_reply: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful reply.
    pub fn with_response(mut self, text: impl Into<String>) -> Self {
        self.responses.get_mut().push_back(Ok(text.into()));
        self
    }

    /// Queue a failing reply.
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        let model = self.name.clone();
        self.responses.get_mut().push_back(Err(ModelError::Api { model, message: message.into() }));
        self
    }

    /// Reply with `text` whenever the queue is empty.
    pub fn with_default_reply(mut self, text: impl Into<String>) -> Self {
        self.default_reply = Some(text.into());
        self
    }

    /// All requests received so far, oldest first.
    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl LanguageModel for MockModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.requests.lock().await.push(request);

        let next = self.responses.lock().await.pop_front();
        match next {
            Some(reply) => reply.map(|text| CompletionResponse { text }),
            None => match &self.default_reply {
                Some(text) => Ok(CompletionResponse { text: text.clone() }),
                None => Err(ModelError::EmptyResponse { model: self.name.clone() }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_queue_then_default() {
        let model = MockModel::new("mock")
            .with_response("first")
            .with_error("boom")
            .with_default_reply("fallback");

        let first = model.complete(CompletionRequest::new("a", 0.0)).await.unwrap();
        assert_eq!(first.text, "first");

        let second = model.complete(CompletionRequest::new("b", 0.0)).await;
        assert!(matches!(second, Err(ModelError::Api { .. })));

        let third = model.complete(CompletionRequest::new("c", 0.5)).await.unwrap();
        assert_eq!(third.text, "fallback");

        let requests = model.requests().await;
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[2].prompt, "c");
        assert!((requests[2].temperature - 0.5).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn empty_queue_without_default_fails() {
        let model = MockModel::new("mock");
        let result = model.complete(CompletionRequest::new("a", 0.0)).await;
        assert!(matches!(result, Err(ModelError::EmptyResponse { .. })));
    }
}
