//! Building providers from rater config entries.
//!
//! A rater names its backend by type (`openai`, `anthropic`, `gemini`) and
//! may carry a small settings object:
//!
//! ```yaml
//! raters:
//!   - id: openai_gpt4o
//!     provider: openai
//!     model: gpt-4o-mini
//!     provider_config:
//!       api_key: sk-...                  # else OPENAI_API_KEY
//!       base_url: http://localhost:8080  # any compatible endpoint
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value as JsonValue;

use super::{LlmProvider, ProviderError};

/// Typed view of a rater's `provider_config`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

impl ProviderSettings {
    /// Decode and check a `provider_config` value; `null` means no settings.
    pub fn from_json(value: &JsonValue) -> Result<Self, ProviderError> {
        if value.is_null() {
            return Ok(Self::default());
        }

        let settings: Self = serde_json::from_value(value.clone())
            .map_err(|e| ProviderError::InvalidSettings(e.to_string()))?;

        if let Some(url) = &settings.base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ProviderError::InvalidSettings(format!(
                    "base_url '{url}' is not an http(s) URL"
                )));
            }
        }
        Ok(settings)
    }

    /// Configured base URL without trailing slash, else `default`.
    pub fn base_url_or(&self, default: &str) -> String {
        self.base_url
            .as_deref()
            .unwrap_or(default)
            .trim_end_matches('/')
            .to_string()
    }
}

/// Builds one provider type.
pub trait ProviderFactory: Send + Sync {
    /// Name raters use in their `provider` field.
    fn provider_type(&self) -> &'static str;

    fn build(&self, settings: &ProviderSettings) -> Result<Arc<dyn LlmProvider>, ProviderError>;
}

/// Provider types known to this build.
#[derive(Default)]
pub struct ProviderRegistry {
    factories: BTreeMap<&'static str, Arc<dyn ProviderFactory>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every adapter compiled in through cargo features.
    #[allow(unused_mut)]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        #[cfg(feature = "anthropic")]
        registry.register(Arc::new(super::AnthropicFactory));

        #[cfg(feature = "gemini")]
        registry.register(Arc::new(super::GeminiFactory));

        #[cfg(feature = "openai")]
        registry.register(Arc::new(super::OpenAiFactory));

        registry
    }

    /// Add a factory, replacing one of the same type.
    pub fn register(&mut self, factory: Arc<dyn ProviderFactory>) {
        self.factories.insert(factory.provider_type(), factory);
    }

    /// Build a provider for one rater.
    pub fn create(
        &self,
        provider_type: &str,
        provider_config: &JsonValue,
    ) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        let factory = self
            .factories
            .get(provider_type)
            .ok_or_else(|| ProviderError::UnknownProvider {
                name: provider_type.to_string(),
                available: self.available_types().iter().map(|t| t.to_string()).collect(),
            })?;

        factory.build(&ProviderSettings::from_json(provider_config)?)
    }

    pub fn available_types(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.available_types())
            .finish()
    }
}
