//! Anthropic messages API.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::http::send_json;
use super::{
    ApiCredential, ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError,
    ProviderFactory, ProviderSettings, Role, TokenUsage,
};

pub const ANTHROPIC_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    credential: ApiCredential,
    base_url: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn from_settings(settings: &ProviderSettings) -> Result<Self, ProviderError> {
        Ok(Self {
            credential: ApiCredential::resolve(
                settings.api_key.as_deref(),
                ANTHROPIC_API_KEY_ENV,
                "Anthropic",
            )?,
            base_url: settings.base_url_or(DEFAULT_BASE_URL),
            client: reqwest::Client::new(),
        })
    }
}

impl std::fmt::Debug for AnthropicProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicProvider")
            .field("credential", &self.credential)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<&'a ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    model: String,
    stop_reason: Option<String>,
    usage: Usage,
}

/// Only text blocks carry `text`; other block types are ignored.
#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        // System text is a top-level field here, not a message
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();

        let request = MessagesRequest {
            model: &config.model,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            system: (!system.is_empty()).then(|| system.join("\n\n")),
            messages: messages.iter().filter(|m| m.role != Role::System).collect(),
        };

        let builder = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", self.credential.expose())
            .header("anthropic-version", API_VERSION)
            .json(&request);

        let body: MessagesResponse = send_json(builder, config.timeout).await?;

        let content: String = body.content.into_iter().filter_map(|b| b.text).collect();
        if content.is_empty() {
            return Err(ProviderError::EmptyResponse(self.name()));
        }

        Ok(CompletionResponse {
            content,
            usage: TokenUsage {
                prompt_tokens: body.usage.input_tokens,
                completion_tokens: body.usage.output_tokens,
            },
            model: body.model,
            stop_reason: body.stop_reason,
        })
    }

    fn name(&self) -> &'static str {
        "anthropic"
    }
}

/// `provider: anthropic`
pub struct AnthropicFactory;

impl ProviderFactory for AnthropicFactory {
    fn provider_type(&self) -> &'static str {
        "anthropic"
    }

    fn build(&self, settings: &ProviderSettings) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        Ok(Arc::new(AnthropicProvider::from_settings(settings)?))
    }
}
