//! Final report over scored records.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use raterbench_core::{
    contributions, group_records, load_json, load_records, score_summary, self_preference, Group,
    ItemRecord, RankingArtifact, RankingLayout, RecordError, ScoreSummaryRow,
};
use serde::{Deserialize, Serialize};

use super::rank::artifact_path;
use super::StageError;

/// How one rater ranked its own questions against everyone else's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfPreferenceSummary {
    pub mean_self_rank: Option<f64>,
    pub mean_other_rank: Option<f64>,
    pub self_samples: usize,
    pub other_samples: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub records: usize,
    pub score_summary: Vec<ScoreSummaryRow>,
    /// "category → subcategory" → origin rater → final questions
    pub contributions: BTreeMap<String, BTreeMap<String, usize>>,
    pub self_preference: BTreeMap<String, SelfPreferenceSummary>,
}

/// Pair each generated group with its saved ranking artifact.
///
/// Self preference is optional in the report: with no generated file the
/// result is empty, and groups without an artifact are left out.
pub fn load_ranked_groups(
    generated: &Path,
    rankings_dir: &Path,
) -> Result<Vec<(Group, RankingArtifact)>, StageError> {
    let records = match load_records(generated) {
        Ok(records) => records,
        Err(RecordError::Missing(path)) => {
            tracing::info!(path = %path.display(), "No generated questions; skipping self preference");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    let mut ranked = Vec::new();
    for group in group_records(&records) {
        match load_json::<RankingArtifact>(artifact_path(rankings_dir, &group.key)) {
            Ok(artifact) => ranked.push((group, artifact)),
            Err(RecordError::Missing(_)) => {
                tracing::debug!(group = %group.key, "No ranking artifact");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(ranked)
}

/// Build the report.
pub fn build_report(
    records: &[ItemRecord],
    ranked_groups: &[(Group, RankingArtifact)],
    layout: RankingLayout,
) -> Report {
    let preferences = self_preference(ranked_groups.iter().map(|(g, a)| (g, a)), layout);

    Report {
        generated_at: Utc::now(),
        records: records.len(),
        score_summary: score_summary(records),
        contributions: contributions(records),
        self_preference: preferences
            .into_iter()
            .map(|(rater, p)| {
                let summary = SelfPreferenceSummary {
                    mean_self_rank: p.mean_self(),
                    mean_other_rank: p.mean_other(),
                    self_samples: p.self_positions.len(),
                    other_samples: p.other_positions.len(),
                };
                (rater, summary)
            })
            .collect(),
    }
}
