//! Consensus ranking within each (category, subcategory) group.
//!
//! Every rater ranks every question of a group, its own included. Accepted
//! rank arrays are saved per group so the report can later measure self
//! preference, then the group's top items move on to the final set.

use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use raterbench_core::{
    aggregate_ranks, group_records, parse_ranking, save_json, top_n, GroupKey, ItemRecord,
    RankingArtifact, RankingLayout,
};
use regex::Regex;
use sha2::{Digest, Sha256};

use super::StageError;
use crate::prompts::ranking_prompt;
use crate::rater::RaterPanel;

lazy_static! {
    static ref UNSAFE_NAME_CHARS: Regex = Regex::new(r"[^\w\-]+").unwrap();
}

/// Where a group's accepted rank arrays are stored.
///
/// Names that are plain words map to `{category}_{subcategory}_rankings.json`.
/// When sanitizing loses information (unsafe characters, or an `_` that
/// would blur the boundary between the two names) a short hash of the raw
/// key keeps distinct groups in distinct files.
pub fn artifact_path(dir: &Path, key: &GroupKey) -> PathBuf {
    let category = UNSAFE_NAME_CHARS.replace_all(&key.category, "_");
    let subcategory = UNSAFE_NAME_CHARS.replace_all(&key.subcategory, "_");

    let lossless = |raw: &str, safe: &str| raw == safe && !raw.contains('_');

    let name = if lossless(&key.category, &category) && lossless(&key.subcategory, &subcategory) {
        format!("{category}_{subcategory}_rankings.json")
    } else {
        format!("{category}_{subcategory}-{}_rankings.json", key_digest(key))
    };
    dir.join(name)
}

/// First 8 hex digits of the SHA-256 of the raw key.
fn key_digest(key: &GroupKey) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.category.as_bytes());
    hasher.update([0x1f]);
    hasher.update(key.subcategory.as_bytes());
    format!("{:x}", hasher.finalize())[..8].to_string()
}

/// Rank every group and keep its `top_n` items.
pub async fn rank(
    panel: &RaterPanel,
    records: &[ItemRecord],
    layout: RankingLayout,
    top: usize,
    rankings_dir: &Path,
) -> Result<Vec<ItemRecord>, StageError> {
    let mut selected = Vec::new();

    for group in group_records(records) {
        let key = &group.key;
        let n = group.len();
        tracing::info!(category = %key.category, subcategory = %key.subcategory, items = n, "Ranking group");

        let questions: Vec<&str> = group.items.iter().map(|r| r.question.as_str()).collect();
        let prompt = ranking_prompt(&key.category, &key.subcategory, &questions, layout);

        let mut artifact = RankingArtifact::new();
        for rater in panel.raters() {
            let Some(raw_text) = panel.ask_raw(rater.as_ref(), &prompt).await else {
                continue;
            };

            match parse_ranking(&raw_text, n) {
                Some(assignment) => {
                    artifact.insert(rater.id().to_string(), assignment);
                }
                None => tracing::warn!(
                    rater = %rater.id(),
                    category = %key.category,
                    subcategory = %key.subcategory,
                    expected = n,
                    "Discarding ranking: not an array of the group's length"
                ),
            }
        }

        save_json(artifact_path(rankings_dir, key), &artifact)?;

        if artifact.is_empty() {
            tracing::warn!(
                category = %key.category,
                subcategory = %key.subcategory,
                "No ranking accepted; group dropped"
            );
            continue;
        }

        let ranked = aggregate_ranks(&group.items, artifact.values(), layout);
        for item in ranked.iter().take(top) {
            tracing::debug!(mean_rank = item.mean_rank, question = %item.item.question, "Selected");
        }
        selected.extend(top_n(&ranked, top));
    }

    Ok(selected)
}
