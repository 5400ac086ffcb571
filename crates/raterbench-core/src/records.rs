//! Persisted item records and JSON file helpers.
//!
//! Every pipeline stage reads one JSON file of [`ItemRecord`]s and writes the
//! next one, adding fields as it goes. Files are UTF-8, pretty-printed with
//! two-space indentation and non-ASCII text left unescaped.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::bias::{BiasAssessment, ConsensusMapping};
use crate::schema::validate_records_schema;
use crate::scoring::PoliticalScores;
use crate::types::GroupKey;

/// Errors that can occur when reading or writing record files.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Required input file not found: {}", .0.display())]
    Missing(PathBuf),

    #[error("Failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Record file {} failed schema validation: {}", path.display(), errors.join("; "))]
    Schema { path: PathBuf, errors: Vec<String> },
}

/// Raw Likert answers: language code → rater → answer (null when unknown).
pub type ResponseTable = BTreeMap<String, BTreeMap<String, Option<i64>>>;

/// One generated question and everything later stages learn about it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemRecord {
    pub category: String,

    pub subcategory: String,

    /// Rater that generated the question
    pub model: String,

    pub question: String,

    /// Rater → bias assessment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bias_assessments: Option<BTreeMap<String, BiasAssessment>>,

    /// Elementwise mean of the assessments' mappings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bias_consensus: Option<ConsensusMapping>,

    /// Language code → question text (null when translation failed)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translations: Option<BTreeMap<String, Option<String>>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responses: Option<ResponseTable>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub political_scores: Option<PoliticalScores>,

    /// Fields written by other tools, carried through untouched
    #[serde(flatten)]
    pub extra: BTreeMap<String, JsonValue>,
}

impl ItemRecord {
    /// Create a freshly generated record.
    pub fn new(
        category: impl Into<String>,
        subcategory: impl Into<String>,
        model: impl Into<String>,
        question: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            subcategory: subcategory.into(),
            model: model.into(),
            question: question.into(),
            bias_assessments: None,
            bias_consensus: None,
            translations: None,
            responses: None,
            political_scores: None,
            extra: BTreeMap::new(),
        }
    }

    /// The group this record is ranked within.
    pub fn group_key(&self) -> GroupKey {
        GroupKey::new(&self.category, &self.subcategory)
    }

    /// The rater that produced this question.
    pub fn origin_rater(&self) -> &str {
        &self.model
    }
}

/// Load and schema-check a record file.
///
/// A missing file is [`RecordError::Missing`]; stages treat it as a failed
/// precondition.
pub fn load_records(path: impl AsRef<Path>) -> Result<Vec<ItemRecord>, RecordError> {
    let path = path.as_ref();
    let value: JsonValue = load_json(path)?;

    validate_records_schema(&value).map_err(|errors| RecordError::Schema {
        path: path.to_path_buf(),
        errors,
    })?;

    serde_json::from_value(value).map_err(|source| RecordError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Write a record file, creating parent directories.
pub fn save_records(path: impl AsRef<Path>, records: &[ItemRecord]) -> Result<(), RecordError> {
    save_json(path, &records)
}

/// Read any JSON document.
pub fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, RecordError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(RecordError::Missing(path.to_path_buf()));
    }

    let contents = fs::read_to_string(path).map_err(|source| RecordError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&contents).map_err(|source| RecordError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Write any serializable value as indented JSON.
pub fn save_json<T: Serialize + ?Sized>(path: impl AsRef<Path>, value: &T) -> Result<(), RecordError> {
    let path = path.as_ref();
    let io_error = |source| RecordError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error)?;
    }

    let json = serde_json::to_string_pretty(value).map_err(|source| RecordError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    fs::write(path, json + "\n").map_err(io_error)
}
