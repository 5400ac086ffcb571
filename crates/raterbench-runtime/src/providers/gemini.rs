//! Google Gemini `generateContent`.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::http::send_json;
use super::{
    ApiCredential, ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError,
    ProviderFactory, ProviderSettings, Role, TokenUsage,
};

pub const GOOGLE_API_KEY_ENV: &str = "GOOGLE_API_KEY";

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiProvider {
    credential: ApiCredential,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn from_settings(settings: &ProviderSettings) -> Result<Self, ProviderError> {
        Ok(Self {
            credential: ApiCredential::resolve(settings.api_key.as_deref(), GOOGLE_API_KEY_ENV, "Google")?,
            base_url: settings.base_url_or(DEFAULT_BASE_URL),
            client: reqwest::Client::new(),
        })
    }

    /// Model names are accepted with or without the `models/` prefix.
    fn endpoint(&self, model: &str) -> String {
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("credential", &self.credential)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<TextPart<'a>>,
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

/// Split chat messages into Gemini turns and a system instruction.
fn to_gemini(messages: &[ChatMessage]) -> (Vec<Content<'_>>, Option<Content<'_>>) {
    let mut system = Vec::new();
    let mut contents = Vec::new();

    for message in messages {
        let text = TextPart { text: &message.content };
        match message.role {
            Role::System => system.push(text),
            Role::User => contents.push(Content { role: Some("user"), parts: vec![text] }),
            Role::Assistant => contents.push(Content { role: Some("model"), parts: vec![text] }),
        }
    }

    let instruction = (!system.is_empty()).then(|| Content { role: None, parts: system });
    (contents, instruction)
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        let (contents, system_instruction) = to_gemini(messages);
        let request = GenerateRequest {
            contents,
            system_instruction,
            generation_config: GenerationConfig {
                temperature: config.temperature,
                max_output_tokens: config.max_tokens,
            },
        };

        let builder = self
            .client
            .post(self.endpoint(&config.model))
            .header("x-goog-api-key", self.credential.expose())
            .json(&request);

        let body: GenerateResponse = send_json(builder, config.timeout).await?;

        // Safety-blocked prompts come back with no candidates at all
        let Some(candidate) = body.candidates.into_iter().next() else {
            return Err(ProviderError::EmptyResponse(self.name()));
        };
        let content: String = candidate
            .content
            .into_iter()
            .flat_map(|c| c.parts)
            .filter_map(|p| p.text)
            .collect();
        if content.is_empty() {
            return Err(ProviderError::EmptyResponse(self.name()));
        }

        let usage = body.usage_metadata.map_or_else(TokenUsage::default, |u| TokenUsage {
            prompt_tokens: u.prompt_token_count,
            completion_tokens: u.candidates_token_count,
        });

        Ok(CompletionResponse {
            content,
            usage,
            model: body.model_version.unwrap_or_else(|| config.model.clone()),
            stop_reason: candidate.finish_reason,
        })
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

/// `provider: gemini`
pub struct GeminiFactory;

impl ProviderFactory for GeminiFactory {
    fn provider_type(&self) -> &'static str {
        "gemini"
    }

    fn build(&self, settings: &ProviderSettings) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        Ok(Arc::new(GeminiProvider::from_settings(settings)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_at(uri: String) -> GeminiProvider {
        GeminiProvider::from_settings(&ProviderSettings {
            api_key: Some("AIza-test".to_string()),
            base_url: Some(uri),
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_accepts_both_model_spellings() {
        let provider = provider_at("http://localhost:1".to_string());
        let expected = "http://localhost:1/models/gemini-2.5-flash:generateContent";
        assert_eq!(provider.endpoint("models/gemini-2.5-flash"), expected);
        assert_eq!(provider.endpoint("gemini-2.5-flash"), expected);
    }

    #[test]
    fn test_system_messages_become_instruction() {
        let messages = [ChatMessage::system("Be brief."), ChatMessage::user("Translate.")];
        let (contents, instruction) = to_gemini(&messages);

        assert_eq!(
            serde_json::to_value(&contents).unwrap(),
            serde_json::json!([{ "role": "user", "parts": [{ "text": "Translate." }] }])
        );
        assert_eq!(
            serde_json::to_value(&instruction).unwrap(),
            serde_json::json!({ "parts": [{ "text": "Be brief." }] })
        );
    }

    #[tokio::test]
    async fn test_parts_are_concatenated() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-test:generateContent"))
            .and(header("x-goog-api-key", "AIza-test"))
            .and(body_partial_json(serde_json::json!({
                "generationConfig": { "maxOutputTokens": 512 }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": { "role": "model", "parts": [{ "text": "Über" }, { "text": "setzt." }] },
                    "finishReason": "STOP"
                }],
                "usageMetadata": { "promptTokenCount": 5, "candidatesTokenCount": 3, "totalTokenCount": 8 },
                "modelVersion": "gemini-test-001"
            })))
            .mount(&server)
            .await;

        let response = provider_at(server.uri())
            .complete(&[ChatMessage::user("Translate.")], &CompletionConfig::new("models/gemini-test"))
            .await
            .unwrap();

        assert_eq!(response.content, "Übersetzt.");
        assert_eq!(response.usage.total(), 8);
        assert_eq!(response.model, "gemini-test-001");
        assert_eq!(response.stop_reason.as_deref(), Some("STOP"));
    }

    #[tokio::test]
    async fn test_blocked_prompt_is_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "promptFeedback": { "blockReason": "SAFETY" }
            })))
            .mount(&server)
            .await;

        let result = provider_at(server.uri())
            .complete(&[ChatMessage::user("hi")], &CompletionConfig::new("gemini-test"))
            .await;
        assert!(matches!(result, Err(ProviderError::EmptyResponse("gemini"))));
    }
}
