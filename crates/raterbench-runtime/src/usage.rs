//! Per-rater token and cost accounting.
//!
//! Reporting only: nothing is throttled on these numbers.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::providers::TokenUsage;

/// Accumulated LLM usage for one rater.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RaterUsage {
    /// Total tokens used
    pub total_tokens: u64,

    /// Prompt/input tokens
    pub prompt_tokens: u64,

    /// Completion/output tokens
    pub completion_tokens: u64,

    /// Successful LLM calls
    pub llm_calls: u32,

    /// Calls that produced no text
    pub failures: u32,

    /// Prompts answered from the response cache
    pub cache_hits: u32,

    /// Estimated cost in USD
    pub estimated_cost: f64,
}

impl RaterUsage {
    /// Add token usage from a provider response.
    pub fn add(&mut self, usage: &TokenUsage, model: &str) {
        self.prompt_tokens += u64::from(usage.prompt_tokens);
        self.completion_tokens += u64::from(usage.completion_tokens);
        self.total_tokens += u64::from(usage.total());
        self.llm_calls += 1;
        self.estimated_cost += estimate_cost(usage, model);
    }

    /// Fold another rater's usage into this one.
    pub fn merge(&mut self, other: &RaterUsage) {
        self.total_tokens += other.total_tokens;
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.llm_calls += other.llm_calls;
        self.failures += other.failures;
        self.cache_hits += other.cache_hits;
        self.estimated_cost += other.estimated_cost;
    }
}

/// Estimate cost for a usage entry.
fn estimate_cost(usage: &TokenUsage, model: &str) -> f64 {
    // USD per million tokens
    let (input_rate, output_rate) = match model {
        m if m.contains("gpt-4o-mini") => (0.15, 0.6),
        m if m.contains("gpt-4o") => (2.5, 10.0),
        m if m.contains("sonnet-4-5") => (3.0, 15.0),
        m if m.contains("haiku-4-5") => (1.0, 5.0),
        m if m.contains("opus-4") => (15.0, 75.0),
        m if m.contains("gemini-2.5-flash") => (0.3, 2.5),
        m if m.contains("gemini-2.5-pro") => (1.25, 10.0),
        _ => (3.0, 15.0),
    };

    let input_cost = (usage.prompt_tokens as f64 / 1_000_000.0) * input_rate;
    let output_cost = (usage.completion_tokens as f64 / 1_000_000.0) * output_rate;

    input_cost + output_cost
}

/// Usage ledger shared by every rater of a panel.
#[derive(Debug, Default)]
pub struct UsageLedger {
    raters: RwLock<BTreeMap<String, RaterUsage>>,
}

impl UsageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful call.
    pub fn record_usage(&self, rater: &str, usage: &TokenUsage, model: &str) {
        self.raters
            .write()
            .entry(rater.to_string())
            .or_default()
            .add(usage, model);
    }

    /// Record a call that produced no text.
    pub fn record_failure(&self, rater: &str) {
        self.raters
            .write()
            .entry(rater.to_string())
            .or_default()
            .failures += 1;
    }

    /// Record a prompt answered from cache.
    pub fn record_cache_hit(&self, rater: &str) {
        self.raters
            .write()
            .entry(rater.to_string())
            .or_default()
            .cache_hits += 1;
    }

    /// Current usage per rater.
    pub fn snapshot(&self) -> BTreeMap<String, RaterUsage> {
        self.raters.read().clone()
    }

    /// Usage summed over every rater.
    pub fn totals(&self) -> RaterUsage {
        let mut totals = RaterUsage::default();
        for usage in self.raters.read().values() {
            totals.merge(usage);
        }
        totals
    }

    /// Log one line per rater.
    pub fn log_summary(&self, stage: &str) {
        for (rater, usage) in self.raters.read().iter() {
            tracing::info!(
                stage,
                rater = %rater,
                calls = usage.llm_calls,
                failures = usage.failures,
                cache_hits = usage.cache_hits,
                tokens = usage.total_tokens,
                estimated_cost_usd = usage.estimated_cost,
                "Rater usage"
            );
        }

        let totals = self.totals();
        tracing::info!(
            stage,
            calls = totals.llm_calls,
            failures = totals.failures,
            tokens = totals.total_tokens,
            estimated_cost_usd = totals.estimated_cost,
            "Stage usage"
        );
    }

    /// Forget everything recorded so far.
    pub fn reset(&self) {
        self.raters.write().clear();
    }
}
