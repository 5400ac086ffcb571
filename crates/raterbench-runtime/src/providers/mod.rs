//! Rater backends.
//!
//! Every rater in the panel is one model behind one chat API. This module
//! holds the wire-independent request and response types, the
//! [`LlmProvider`] trait the HTTP adapters implement and the registry that
//! builds a provider from a rater's config entry.
//!
//! Adapters for OpenAI chat completions, Anthropic messages and Google Gemini
//! `generateContent` are compiled in by the `openai`, `anthropic` and
//! `gemini` features. API keys go through [`secrets`] and are never logged.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod factory;
pub mod secrets;

#[cfg(any(feature = "anthropic", feature = "openai", feature = "gemini"))]
mod http;

#[cfg(feature = "anthropic")]
mod anthropic;

#[cfg(feature = "gemini")]
mod gemini;

#[cfg(feature = "openai")]
mod openai;

pub use factory::{ProviderFactory, ProviderRegistry, ProviderSettings};
pub use secrets::{ApiCredential, CredentialSource};

#[cfg(feature = "anthropic")]
pub use anthropic::{AnthropicFactory, AnthropicProvider};

#[cfg(feature = "gemini")]
pub use gemini::{GeminiFactory, GeminiProvider};

#[cfg(feature = "openai")]
pub use openai::{OpenAiFactory, OpenAiProvider};

/// Why a provider could not be built or a completion failed.
///
/// Construction errors make the panel skip a rater; call errors are absorbed
/// by the panel into a `null` answer.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Unknown provider '{name}' (compiled in: {})", available.join(", "))]
    UnknownProvider { name: String, available: Vec<String> },

    #[error("No {provider} API key: set 'api_key' in the rater config or {env_var}")]
    MissingCredential {
        provider: &'static str,
        env_var: &'static str,
    },

    #[error("Invalid provider settings: {0}")]
    InvalidSettings(String),

    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Authentication rejected")]
    AuthError,

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Undecodable response body: {0}")]
    ParseError(String),

    #[error("{0} returned no text")]
    EmptyResponse(&'static str),
}

/// Per-rater request parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

impl CompletionConfig {
    /// Short, deterministic replies: 512 tokens at temperature 0.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            max_tokens: 512,
            temperature: 0.0,
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Reply text plus what the call cost.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResponse {
    pub content: String,
    pub usage: TokenUsage,
    /// Model name as reported by the API
    pub model: String,
    pub stop_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// One chat API.
///
/// Nothing in `raterbench-core` reaches a provider; all model calls pass
/// through here.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Run one chat completion.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError>;

    /// Provider type, as named in the rater config.
    fn name(&self) -> &'static str;
}
