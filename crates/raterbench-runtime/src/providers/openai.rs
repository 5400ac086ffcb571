//! OpenAI chat completions.
//!
//! Any server speaking the same wire format works through `base_url`.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::http::send_json;
use super::{
    ApiCredential, ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError,
    ProviderFactory, ProviderSettings, TokenUsage,
};

pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAiProvider {
    credential: ApiCredential,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn from_settings(settings: &ProviderSettings) -> Result<Self, ProviderError> {
        Ok(Self {
            credential: ApiCredential::resolve(settings.api_key.as_deref(), OPENAI_API_KEY_ENV, "OpenAI")?,
            base_url: settings.base_url_or(DEFAULT_BASE_URL),
            client: reqwest::Client::new(),
        })
    }
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("credential", &self.credential)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    model: String,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
    finish_reason: Option<String>,
}

/// `content` is null when a filter stopped the reply.
#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        let request = ChatRequest {
            model: &config.model,
            messages,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        };

        let builder = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.credential.expose())
            .json(&request);

        let body: ChatResponse = send_json(builder, config.timeout).await?;

        let Some(Choice {
            message: AssistantMessage { content: Some(content) },
            finish_reason,
        }) = body.choices.into_iter().next()
        else {
            return Err(ProviderError::EmptyResponse(self.name()));
        };

        let usage = body.usage.map_or_else(TokenUsage::default, |u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
        });

        Ok(CompletionResponse {
            content,
            usage,
            model: body.model,
            stop_reason: finish_reason,
        })
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

/// `provider: openai`
pub struct OpenAiFactory;

impl ProviderFactory for OpenAiFactory {
    fn provider_type(&self) -> &'static str {
        "openai"
    }

    fn build(&self, settings: &ProviderSettings) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        Ok(Arc::new(OpenAiProvider::from_settings(settings)?))
    }
}
