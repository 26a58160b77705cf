//! OpenAI client implementation.

use async_openai::{
    Client,
    config::OpenAIConfig as AsyncOpenAIConfig,
    error::OpenAIError,
    types::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs},
};
use async_trait::async_trait;
use tracing::{debug, error};

use super::config::OpenAIConfig;
use crate::error::{ModelError, Result};
use crate::model::{CompletionRequest, CompletionResponse, LanguageModel};

/// [`LanguageModel`] backed by the OpenAI chat-completions API.
///
/// Each request is sent as a single user message and the first choice's
/// content is returned.
pub struct OpenAIChatModel {
    client: Client<AsyncOpenAIConfig>,
    model: String,
}

impl OpenAIChatModel {
    /// Create a new OpenAI chat model client.
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(ModelError::Config("API key must not be empty".to_string()));
        }

        let mut openai_config = AsyncOpenAIConfig::new().with_api_key(&config.api_key);

        if let Some(org_id) = &config.organization_id {
            openai_config = openai_config.with_org_id(org_id);
        }

        if let Some(base_url) = &config.base_url {
            openai_config = openai_config.with_api_base(base_url);
        }

        Ok(Self { client: Client::with_config(openai_config), model: config.model })
    }

    fn request_error(&self, e: OpenAIError) -> ModelError {
        match e {
            OpenAIError::ApiError(api) => {
                ModelError::Api { model: self.model.clone(), message: api.message }
            }
            other => ModelError::Request { model: self.model.clone(), message: other.to_string() },
        }
    }
}

#[async_trait]
impl LanguageModel for OpenAIChatModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        debug!(
            model = %self.model,
            prompt_len = request.prompt.len(),
            temperature = request.temperature,
            "requesting completion"
        );

        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(request.prompt)
            .build()
            .map_err(|e| self.request_error(e))?;

        let openai_request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .temperature(request.temperature)
            .messages(vec![message.into()])
            .build()
            .map_err(|e| self.request_error(e))?;

        let response = self.client.chat().create(openai_request).await.map_err(|e| {
            error!(model = %self.model, error = %e, "chat completion failed");
            self.request_error(e)
        })?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ModelError::EmptyResponse { model: self.model.clone() })?;

        Ok(CompletionResponse { text })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_api_key() {
        let result = OpenAIChatModel::new(OpenAIConfig::new("", "gpt-4-turbo"));
        assert!(matches!(result, Err(ModelError::Config(_))));
    }

    #[test]
    fn reports_model_name() {
        let model = OpenAIChatModel::new(OpenAIConfig::new("sk-test", "gpt-4-turbo")).unwrap();
        assert_eq!(model.name(), "gpt-4-turbo");
    }
}
