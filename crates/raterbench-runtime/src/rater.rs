//! The rater panel.
//!
//! A rater is anything that turns a prompt into reply text
//! ([`RaterGateway`]). The panel owns the raters and is the single place
//! where calls are paced, cached, accounted for, and where failures are
//! absorbed into `None`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use raterbench_core::{parse, ExpectedShape, RaterResponse};

use crate::cache::{CacheKey, ResponseCache};
use crate::config::PipelineConfig;
use crate::providers::{ChatMessage, CompletionConfig, LlmProvider, ProviderError, ProviderRegistry};
use crate::usage::UsageLedger;

/// One independent LLM rater.
#[async_trait]
pub trait RaterGateway: Send + Sync {
    /// Name the rater's answers are recorded under.
    fn id(&self) -> &str;

    /// Send one prompt and return the reply text.
    async fn call(&self, prompt: &str) -> Result<String, ProviderError>;
}

/// A rater backed by an [`LlmProvider`].
pub struct ProviderRater {
    id: String,
    provider: Arc<dyn LlmProvider>,
    completion: CompletionConfig,
    ledger: Arc<UsageLedger>,
}

impl ProviderRater {
    pub fn new(
        id: impl Into<String>,
        provider: Arc<dyn LlmProvider>,
        completion: CompletionConfig,
        ledger: Arc<UsageLedger>,
    ) -> Self {
        Self {
            id: id.into(),
            provider,
            completion,
            ledger,
        }
    }
}

impl std::fmt::Debug for ProviderRater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRater")
            .field("id", &self.id)
            .field("provider", &self.provider.name())
            .field("model", &self.completion.model)
            .finish()
    }
}

#[async_trait]
impl RaterGateway for ProviderRater {
    fn id(&self) -> &str {
        &self.id
    }

    async fn call(&self, prompt: &str) -> Result<String, ProviderError> {
        let response = self
            .provider
            .complete(&[ChatMessage::user(prompt)], &self.completion)
            .await?;

        self.ledger
            .record_usage(&self.id, &response.usage, &response.model);

        Ok(response.content.trim().to_string())
    }
}

/// The configured raters plus pacing, caching and usage accounting.
pub struct RaterPanel {
    raters: Vec<Arc<dyn RaterGateway>>,
    pacing: Duration,
    cache: Option<ResponseCache>,
    ledger: Arc<UsageLedger>,
    called: AtomicBool,
}

impl RaterPanel {
    /// A panel over ready-made raters, with no pacing and no cache.
    pub fn new(raters: Vec<Arc<dyn RaterGateway>>) -> Self {
        Self {
            raters,
            pacing: Duration::ZERO,
            cache: None,
            ledger: Arc::new(UsageLedger::new()),
            called: AtomicBool::new(false),
        }
    }

    /// Build the panel a config describes.
    ///
    /// A rater whose provider cannot be constructed (unknown type, feature
    /// not compiled in, missing credential) is skipped with a warning.
    pub fn from_config(config: &PipelineConfig, registry: &ProviderRegistry) -> Self {
        let ledger = Arc::new(UsageLedger::new());
        let mut raters: Vec<Arc<dyn RaterGateway>> = Vec::new();

        for rater in &config.raters {
            match registry.create(&rater.provider, &rater.provider_config) {
                Ok(provider) => {
                    let completion = CompletionConfig {
                        model: rater.model.clone(),
                        max_tokens: rater.max_tokens,
                        temperature: rater.temperature,
                        timeout: config.request_timeout,
                    };
                    raters.push(Arc::new(ProviderRater::new(
                        rater.id.clone(),
                        provider,
                        completion,
                        Arc::clone(&ledger),
                    )));
                }
                Err(e) => {
                    tracing::warn!(rater = %rater.id, provider = %rater.provider, error = %e, "Rater unavailable, skipping");
                }
            }
        }

        let cache = ResponseCache::from_config(&config.cache);

        Self {
            raters,
            pacing: config.pacing,
            cache,
            ledger,
            called: AtomicBool::new(false),
        }
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Raters in calling order.
    pub fn raters(&self) -> &[Arc<dyn RaterGateway>] {
        &self.raters
    }

    pub fn rater(&self, id: &str) -> Option<&Arc<dyn RaterGateway>> {
        self.raters.iter().find(|r| r.id() == id)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.raters.iter().map(|r| r.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.raters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raters.is_empty()
    }

    pub fn ledger(&self) -> &UsageLedger {
        &self.ledger
    }

    /// Ask one rater one prompt.
    ///
    /// Transport failures are logged and become `None`. Cached replies are
    /// returned without calling the rater and without pacing.
    pub async fn ask_raw(&self, rater: &dyn RaterGateway, prompt: &str) -> Option<String> {
        let key = CacheKey::new(rater.id(), prompt);
        if let Some(cache) = &self.cache {
            if let Some(reply) = cache.get(&key).await {
                tracing::debug!(rater = %rater.id(), "Reply served from cache");
                self.ledger.record_cache_hit(rater.id());
                return Some(reply);
            }
        }

        self.pace().await;

        match rater.call(prompt).await {
            Ok(reply) => {
                if let Some(cache) = &self.cache {
                    cache.insert(key, reply.clone()).await;
                }
                Some(reply)
            }
            Err(e) => {
                tracing::warn!(rater = %rater.id(), error = %e, "Rater call failed");
                self.ledger.record_failure(rater.id());
                None
            }
        }
    }

    /// Ask one rater one prompt and parse the reply.
    pub async fn ask(
        &self,
        rater: &dyn RaterGateway,
        prompt: &str,
        shape: ExpectedShape,
    ) -> RaterResponse {
        let Some(raw_text) = self.ask_raw(rater, prompt).await else {
            return RaterResponse::failed(rater.id());
        };

        let parsed = parse(&raw_text, shape);
        if parsed.is_none() {
            tracing::warn!(rater = %rater.id(), expected = ?shape, "Unparseable rater reply");
        }

        RaterResponse {
            rater_id: rater.id().to_string(),
            raw_text: Some(raw_text),
            parsed,
        }
    }

    /// Sleep the pacing delay before every call but the first.
    async fn pace(&self) {
        if self.called.swap(true, Ordering::SeqCst) && !self.pacing.is_zero() {
            tokio::time::sleep(self.pacing).await;
        }
    }
}

impl std::fmt::Debug for RaterPanel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RaterPanel")
            .field("raters", &self.ids())
            .field("pacing", &self.pacing)
            .field("cache", &self.cache)
            .finish()
    }
}
