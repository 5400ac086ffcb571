//! Pipeline configuration.
//!
//! Loaded from YAML; every field has a default, so an empty file (or no
//! file at all) reproduces the reference setup of three raters and three
//! languages.
//!
//! ```yaml
//! raters:
//!   - id: openai_gpt4o
//!     provider: openai
//!     model: gpt-4o-mini
//!   - id: local_llama
//!     provider: openai
//!     model: llama3
//!     provider_config:
//!       base_url: http://localhost:11434/v1
//!       api_key: unused
//! translator: openai_gpt4o
//! languages:
//!   en: English
//!   de: German
//! pacing: 250ms
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use raterbench_core::{MappingPreference, RankingLayout, CONSENSUS_KEY};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Errors from loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML in {}: {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Everything the pipeline driver needs to run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub paths: PathsConfig,

    /// The rater panel, in calling order
    pub raters: Vec<RaterConfig>,

    /// Rater id used for every translation
    pub translator: String,

    /// Language code → language name used in prompts
    pub languages: BTreeMap<String, String>,

    /// Language the questions are generated in; copied, never translated
    pub source_language: String,

    /// Questions each rater generates per subcategory
    pub questions_per_rater: usize,

    /// Questions kept per group after ranking
    pub top_n: usize,

    /// Pause between consecutive rater calls
    #[serde(with = "humantime_duration")]
    pub pacing: Duration,

    /// Per-request HTTP timeout
    #[serde(with = "humantime_duration")]
    pub request_timeout: Duration,

    pub ranking_layout: RankingLayout,

    pub mapping_preference: MappingPreference,

    pub cache: CacheConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            raters: vec![
                RaterConfig::new("openai_gpt4o", "openai", "gpt-4o-mini"),
                RaterConfig::new("anthropic_claude", "anthropic", "claude-sonnet-4-5-20250929"),
                RaterConfig::new("google_gemini", "gemini", "models/gemini-2.5-flash"),
            ],
            translator: "openai_gpt4o".to_string(),
            languages: BTreeMap::from([
                ("en".to_string(), "English".to_string()),
                ("de".to_string(), "German".to_string()),
                ("ko".to_string(), "Korean".to_string()),
            ]),
            source_language: "en".to_string(),
            questions_per_rater: 10,
            top_n: 10,
            pacing: Duration::from_millis(500),
            request_timeout: Duration::from_secs(30),
            ranking_layout: RankingLayout::default(),
            mapping_preference: MappingPreference::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load and validate a YAML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = serde_yaml::from_str(&contents).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Parse and validate YAML text.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml).map_err(|source| ConfigError::Yaml {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.raters.is_empty() {
            return Err(ConfigError::Invalid("at least one rater is required".to_string()));
        }

        let mut seen = BTreeSet::new();
        for rater in &self.raters {
            if rater.id.trim().is_empty() {
                return Err(ConfigError::Invalid("rater id must not be empty".to_string()));
            }
            if rater.id == CONSENSUS_KEY {
                return Err(ConfigError::Invalid(format!(
                    "rater id '{CONSENSUS_KEY}' is reserved for the score consensus column"
                )));
            }
            if !seen.insert(rater.id.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate rater id '{}'", rater.id)));
            }
        }

        if !seen.contains(self.translator.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "translator '{}' is not one of the configured raters",
                self.translator
            )));
        }

        if !self.languages.contains_key(&self.source_language) {
            return Err(ConfigError::Invalid(format!(
                "source language '{}' is missing from languages",
                self.source_language
            )));
        }

        if self.top_n == 0 || self.questions_per_rater == 0 {
            return Err(ConfigError::Invalid(
                "top_n and questions_per_rater must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Prompt name for a language code, or the code itself.
    pub fn language_name<'a>(&'a self, code: &'a str) -> &'a str {
        self.languages.get(code).map(String::as_str).unwrap_or(code)
    }
}

/// One rater of the panel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RaterConfig {
    /// Name the rater's answers are recorded under
    pub id: String,

    /// Provider type: `openai`, `anthropic` or `gemini`
    pub provider: String,

    pub model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default)]
    pub temperature: f32,

    /// Passed to the provider factory (`api_key`, `base_url`, ...)
    #[serde(default = "empty_object")]
    pub provider_config: JsonValue,
}

impl RaterConfig {
    pub fn new(id: impl Into<String>, provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            provider: provider.into(),
            model: model.into(),
            max_tokens: default_max_tokens(),
            temperature: 0.0,
            provider_config: empty_object(),
        }
    }
}

fn default_max_tokens() -> u32 {
    512
}

fn empty_object() -> JsonValue {
    JsonValue::Object(Default::default())
}

/// Where each stage reads and writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Category → subcategories
    pub categories: PathBuf,
    pub generated: PathBuf,
    /// Directory of per-group ranking artifacts
    pub rankings_dir: PathBuf,
    pub final_set: PathBuf,
    pub with_bias: PathBuf,
    pub translated: PathBuf,
    pub responses: PathBuf,
    pub mapped: PathBuf,
    pub report: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            categories: PathBuf::from("config/categories.json"),
            generated: PathBuf::from("data/raw/generated_questions.json"),
            rankings_dir: PathBuf::from("data/ranked"),
            final_set: PathBuf::from("data/processed/final_question_set.json"),
            with_bias: PathBuf::from("data/processed/final_question_set_with_bias.json"),
            translated: PathBuf::from("data/processed/final_question_set_translated.json"),
            responses: PathBuf::from("data/responses/final_question_responses.json"),
            mapped: PathBuf::from("data/responses/final_question_responses_mapped.json"),
            report: PathBuf::from("results/report.json"),
        }
    }
}

impl PathsConfig {
    /// Resolve every relative path against `root`.
    pub fn rooted_at(&self, root: &Path) -> Self {
        let join = |p: &PathBuf| if p.is_absolute() { p.clone() } else { root.join(p) };
        Self {
            categories: join(&self.categories),
            generated: join(&self.generated),
            rankings_dir: join(&self.rankings_dir),
            final_set: join(&self.final_set),
            with_bias: join(&self.with_bias),
            translated: join(&self.translated),
            responses: join(&self.responses),
            mapped: join(&self.mapped),
            report: join(&self.report),
        }
    }
}

/// Response cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_entries: u64,
    #[serde(with = "humantime_duration")]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 10_000,
            ttl: Duration::from_secs(3600),
        }
    }
}

mod humantime_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(serde::de::Error::custom)
    }
}
