//! Response-to-score mapping.
//!
//! A raw Likert answer is looked up in a five-point mapping to get a
//! political score; per language, the raters' scores reduce to one consensus
//! value.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::bias::LikertMapping;
use crate::records::ItemRecord;

/// Which mapping wins when both a consensus and a rater mapping exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingPreference {
    /// Consensus mapping, else the rater's own, else identity.
    ///
    /// A mapping with no known entry counts as missing.
    #[default]
    ConsensusFirst,

    /// The rater's own mapping whenever it assessed the question, else
    /// identity. The consensus is never consulted.
    RaterFirst,
}

/// Column of [`LanguageScores`] that holds the consensus. No rater may use
/// it as an id.
pub const CONSENSUS_KEY: &str = "consensus";

/// Scores for one language of one question.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LanguageScores {
    /// Rater → political score
    #[serde(flatten)]
    pub raters: BTreeMap<String, Option<f64>>,

    /// Mean of the known rater scores
    #[serde(default)]
    pub consensus: Option<f64>,
}

/// Language code → scores.
pub type PoliticalScores = BTreeMap<String, LanguageScores>;

/// Project a raw answer through a mapping.
///
/// Answers outside `1..=5` and unknown mapping entries give `None`.
pub fn map_response(raw: Option<i64>, mapping: &LikertMapping) -> Option<f64> {
    mapping.get(raw?)
}

/// Mean of the known scores, `None` when there are none.
pub fn consensus_score<I>(scores: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let (sum, count) = scores
        .into_iter()
        .flatten()
        .fold((0.0, 0_usize), |(sum, count), score| (sum + score, count + 1));

    (count > 0).then(|| sum / count as f64)
}

/// Pick the mapping a rater's answers are projected through.
pub fn select_mapping(
    preference: MappingPreference,
    consensus: Option<&LikertMapping>,
    rater_mapping: Option<&LikertMapping>,
) -> LikertMapping {
    match preference {
        MappingPreference::ConsensusFirst => consensus
            .filter(|m| m.has_any())
            .or(rater_mapping.filter(|m| m.has_any()))
            .copied()
            .unwrap_or_else(LikertMapping::identity),
        MappingPreference::RaterFirst => rater_mapping
            .copied()
            .unwrap_or_else(LikertMapping::identity),
    }
}

/// Compute political scores for every language a record has responses in.
///
/// Pure: the record is not modified and repeated calls agree.
pub fn score_record(record: &ItemRecord, preference: MappingPreference) -> PoliticalScores {
    let Some(responses) = &record.responses else {
        return PoliticalScores::new();
    };

    let consensus = record.bias_consensus.as_ref();
    let rater_mappings: BTreeMap<&str, LikertMapping> = record
        .bias_assessments
        .iter()
        .flatten()
        .map(|(rater, assessment)| (rater.as_str(), assessment.mapping()))
        .collect();

    responses
        .iter()
        .map(|(language, answers)| {
            let raters: BTreeMap<String, Option<f64>> = answers
                .iter()
                .filter(|(rater, _)| {
                    let reserved = rater.as_str() == CONSENSUS_KEY;
                    if reserved {
                        tracing::warn!(language = %language, "Ignoring answers under the reserved rater id 'consensus'");
                    }
                    !reserved
                })
                .map(|(rater, raw)| {
                    let mapping =
                        select_mapping(preference, consensus, rater_mappings.get(rater.as_str()));
                    (rater.clone(), map_response(*raw, &mapping))
                })
                .collect();

            let consensus = consensus_score(raters.values().copied());
            (language.clone(), LanguageScores { raters, consensus })
        })
        .collect()
}
