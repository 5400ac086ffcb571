//! Bias mapping aggregation.
//!
//! Each rater tells us, per question, which political score (1 = left,
//! 5 = right) a Likert answer of 1..5 implies. A question phrased from the
//! left gets the inverse mapping `[5, 4, 3, 2, 1]`.
//!
//! The consensus is computed independently at every index: the unweighted
//! mean of the raters that gave a number there. No clamping, smoothing or
//! outlier rejection.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::types::{IDENTITY_MAPPING, LIKERT_POINTS};

/// Five political-score values, one per Likert answer.
///
/// Index 0 holds the score for answer 1. `None` means unknown.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LikertMapping([Option<f64>; LIKERT_POINTS]);

/// One rater's mapping for one question.
pub type BiasMapping = LikertMapping;

/// The per-index mean over all raters' mappings for one question.
pub type ConsensusMapping = LikertMapping;

impl LikertMapping {
    pub fn new(values: [Option<f64>; LIKERT_POINTS]) -> Self {
        Self(values)
    }

    /// The mapping `[1, 2, 3, 4, 5]`.
    pub fn identity() -> Self {
        Self(IDENTITY_MAPPING.map(Some))
    }

    /// A mapping with every index unknown.
    pub fn unknown() -> Self {
        Self::default()
    }

    /// Build a mapping from raw JSON entries.
    ///
    /// Anything but exactly five entries is a shape mismatch and yields an
    /// all-unknown mapping. Within a well-shaped sequence, non-numeric
    /// entries are unknown; numbers are kept as given, in range or not.
    pub fn from_values(values: &[JsonValue]) -> Self {
        if values.len() != LIKERT_POINTS {
            tracing::debug!(entries = values.len(), "Mapping is not five entries long");
            return Self::unknown();
        }

        let mut mapping = [None; LIKERT_POINTS];
        for (slot, value) in mapping.iter_mut().zip(values) {
            *slot = value.as_f64();
        }
        Self(mapping)
    }

    /// Read the `mapping` key of a rater's assessment object.
    pub fn from_assessment(assessment: &JsonValue) -> Self {
        match assessment.get("mapping") {
            Some(JsonValue::Array(values)) => Self::from_values(values),
            _ => Self::unknown(),
        }
    }

    /// Value for a Likert answer in `1..=5`.
    pub fn get(&self, likert: i64) -> Option<f64> {
        let index = usize::try_from(likert).ok()?.checked_sub(1)?;
        self.0.get(index).copied().flatten()
    }

    pub fn values(&self) -> &[Option<f64>; LIKERT_POINTS] {
        &self.0
    }

    /// True when at least one index is known.
    pub fn has_any(&self) -> bool {
        self.0.iter().any(Option::is_some)
    }
}

/// Merge raters' mappings into a consensus mapping.
///
/// At each index the result is the mean of exactly the known values found
/// there, or unknown if no rater supplied one.
pub fn aggregate_bias_mapping<'a, I>(mappings: I) -> ConsensusMapping
where
    I: IntoIterator<Item = &'a BiasMapping>,
{
    let mut sums = [0.0_f64; LIKERT_POINTS];
    let mut counts = [0_usize; LIKERT_POINTS];

    for mapping in mappings {
        for (index, value) in mapping.values().iter().enumerate() {
            if let Some(value) = value {
                sums[index] += value;
                counts[index] += 1;
            }
        }
    }

    let mut consensus = [None; LIKERT_POINTS];
    for index in 0..LIKERT_POINTS {
        if counts[index] > 0 {
            consensus[index] = Some(sums[index] / counts[index] as f64);
        }
    }
    LikertMapping(consensus)
}

/// A rater's bias assessment as persisted in the record.
///
/// `mapping` keeps whatever the rater returned so the record stays an
/// honest trace of the reply; [`BiasAssessment::mapping`] interprets it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BiasAssessment {
    #[serde(default)]
    pub mapping: JsonValue,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,

    /// Any other keys the rater included
    #[serde(flatten)]
    pub extra: BTreeMap<String, JsonValue>,
}

impl BiasAssessment {
    /// Wrap a parsed reply object.
    pub fn from_object(mut object: Map<String, JsonValue>) -> Self {
        let mapping = object.remove("mapping").unwrap_or(JsonValue::Null);

        let explanation = match object.remove("explanation") {
            Some(JsonValue::String(text)) => Some(text),
            Some(other) => {
                object.insert("explanation".to_string(), other);
                None
            }
            None => None,
        };

        Self {
            mapping,
            explanation,
            extra: object.into_iter().collect(),
        }
    }

    /// Placeholder for a reply that held no usable object.
    ///
    /// The mapping is five nulls and the raw reply, if any, is kept as the
    /// explanation.
    pub fn unparsed(raw_text: Option<String>) -> Self {
        Self {
            mapping: JsonValue::Array(vec![JsonValue::Null; LIKERT_POINTS]),
            explanation: raw_text,
            extra: BTreeMap::new(),
        }
    }

    /// The numeric mapping this assessment asserts.
    pub fn mapping(&self) -> BiasMapping {
        match &self.mapping {
            JsonValue::Array(values) => LikertMapping::from_values(values),
            _ => LikertMapping::unknown(),
        }
    }
}
