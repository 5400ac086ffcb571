//! # raterbench-core
//!
//! Deterministic cross-rater consensus aggregation.
//!
//! This crate turns the free-text output of several independent LLM raters
//! into stable per-question statistics:
//! - Which generated questions win within their (category, subcategory) group?
//! - How does each Likert answer map onto the political axis?
//! - What political score do the raters agree on, per language?
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: Same input always produces same output
//! 2. **No LLM calls**: Raters are reached only through `raterbench-runtime`
//! 3. **Total**: Garbled rater output becomes an explicit unknown, never a panic
//! 4. **Unweighted**: Every consensus is a plain arithmetic mean of valid contributions
//!
//! ## Example
//!
//! ```rust
//! use raterbench_core::{aggregate_bias_mapping, map_response, LikertMapping};
//!
//! let left = LikertMapping::identity();
//! let right = LikertMapping::from_values(&[5.0.into(), 4.0.into(), 3.0.into(), 2.0.into(), 1.0.into()]);
//! let consensus = aggregate_bias_mapping([&left, &right]);
//!
//! assert_eq!(map_response(Some(4), &consensus), Some(3.0));
//! assert_eq!(map_response(None, &consensus), None);
//! ```

pub mod bias;
pub mod parser;
pub mod ranking;
pub mod records;
pub mod report;
pub mod schema;
pub mod scoring;
pub mod types;

// Re-export main types at crate root
pub use bias::{aggregate_bias_mapping, BiasAssessment, BiasMapping, ConsensusMapping, LikertMapping};
pub use parser::{extract_span, parse, parse_integer, ExpectedShape, ParsedValue};
pub use ranking::{
    accept_ranking, aggregate_ranks, mean_ranks, parse_ranking, self_preference, top_n,
    RankAssignment, RankedItem, RankingArtifact, RankingLayout, SelfPreference,
};
pub use records::{load_json, load_records, save_json, save_records, ItemRecord, RecordError};
pub use report::{contributions, score_summary, ScoreSummaryRow};
pub use scoring::{
    consensus_score, map_response, score_record, select_mapping, LanguageScores, CONSENSUS_KEY,
    MappingPreference, PoliticalScores,
};
pub use types::{group_records, Group, GroupKey, RaterResponse, IDENTITY_MAPPING, LIKERT_POINTS};
