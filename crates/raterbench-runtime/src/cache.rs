//! In-memory cache of rater replies.
//!
//! Identical prompts to the same rater within one run (a stage re-run, or
//! the same question text in two groups) reach the API once. Only
//! successful replies are stored.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use moka::future::Cache;

use crate::config::CacheConfig;

/// (rater, prompt) identity of a reply.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    rater: String,
    prompt_hash: u64,
}

impl CacheKey {
    pub fn new(rater: &str, prompt: &str) -> Self {
        let mut hasher = DefaultHasher::new();
        prompt.hash(&mut hasher);
        Self {
            rater: rater.to_string(),
            prompt_hash: hasher.finish(),
        }
    }
}

pub struct ResponseCache {
    replies: Cache<CacheKey, String>,
}

impl ResponseCache {
    /// A cache sized by config, or `None` when caching is disabled.
    pub fn from_config(config: &CacheConfig) -> Option<Self> {
        config.enabled.then(|| Self::sized(config))
    }

    fn sized(config: &CacheConfig) -> Self {
        Self {
            replies: Cache::builder()
                .max_capacity(config.max_entries)
                .time_to_live(config.ttl)
                .build(),
        }
    }

    pub async fn get(&self, key: &CacheKey) -> Option<String> {
        self.replies.get(key).await
    }

    pub async fn insert(&self, key: CacheKey, reply: String) {
        self.replies.insert(key, reply).await;
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::sized(&CacheConfig::default())
    }
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("entries", &self.replies.entry_count())
            .finish()
    }
}
