//! # raterbench-runtime
//!
//! The LLM side of raterbench: rater providers, the rater panel, pipeline
//! configuration and the stages that call raters.
//!
//! ## Important
//!
//! All aggregation (rank means, bias consensus, score mapping) lives in
//! `raterbench-core` and is deterministic. This crate only gathers rater
//! replies and hands them to core.
//!
//! Rater calls are sequential and paced. A rater that fails or replies with
//! something unusable contributes `null` for that question and the stage
//! moves on; only a missing or invalid input file stops a stage.
//!
//! ## Example
//!
//! ```rust,ignore
//! use raterbench_runtime::{PipelineConfig, PipelineDriver, ProviderRegistry, RaterPanel, Stage};
//!
//! let config = PipelineConfig::load("config/raterbench.yaml")?;
//! let panel = RaterPanel::from_config(&config, &ProviderRegistry::with_defaults());
//! let driver = PipelineDriver::new(config, panel);
//!
//! let summary = driver.run(Stage::Rank).await?;
//! println!("kept {} questions", summary.output);
//! ```

pub mod cache;
pub mod config;
pub mod pipeline;
pub mod prompts;
pub mod providers;
pub mod rater;
pub mod usage;

pub use cache::{CacheKey, ResponseCache};
pub use config::{CacheConfig, ConfigError, PathsConfig, PipelineConfig, RaterConfig};
pub use pipeline::{PipelineDriver, Stage, StageError, StageSummary};
pub use providers::{
    ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError,
    ProviderRegistry, ProviderSettings, TokenUsage,
};
pub use rater::{ProviderRater, RaterGateway, RaterPanel};
pub use usage::{RaterUsage, UsageLedger};
