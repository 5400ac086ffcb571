//! Summary reductions over scored records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::records::ItemRecord;

/// Mean political score of one rater, in one language, over a subcategory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummaryRow {
    pub subcategory: String,
    pub language: String,
    pub rater: String,
    pub mean_score: f64,
    /// Number of known scores behind the mean
    pub samples: usize,
}

/// Per-rater mean scores grouped by (subcategory, language, rater).
///
/// Unknown scores are skipped; groups with no known score produce no row.
/// Rows come out sorted by the grouping key.
pub fn score_summary(records: &[ItemRecord]) -> Vec<ScoreSummaryRow> {
    let mut totals: BTreeMap<(&str, &str, &str), (f64, usize)> = BTreeMap::new();

    for record in records {
        let Some(scores) = &record.political_scores else {
            continue;
        };
        for (language, language_scores) in scores {
            for (rater, score) in &language_scores.raters {
                let Some(score) = score else { continue };
                let entry = totals
                    .entry((record.subcategory.as_str(), language.as_str(), rater.as_str()))
                    .or_insert((0.0, 0));
                entry.0 += score;
                entry.1 += 1;
            }
        }
    }

    totals
        .into_iter()
        .map(|((subcategory, language, rater), (sum, samples))| ScoreSummaryRow {
            subcategory: subcategory.to_string(),
            language: language.to_string(),
            rater: rater.to_string(),
            mean_score: sum / samples as f64,
            samples,
        })
        .collect()
}

/// Final questions per `"category → subcategory"`, per origin rater.
pub fn contributions(records: &[ItemRecord]) -> BTreeMap<String, BTreeMap<String, usize>> {
    let mut counts: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();

    for record in records {
        *counts
            .entry(record.group_key().to_string())
            .or_default()
            .entry(record.origin_rater().to_string())
            .or_default() += 1;
    }

    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{LanguageScores, PoliticalScores};

    fn scored(subcategory: &str, model: &str, language: &str, scores: &[(&str, Option<f64>)]) -> ItemRecord {
        let mut record = ItemRecord::new("Partisanship", subcategory, model, "q");
        let raters: BTreeMap<String, Option<f64>> = scores
            .iter()
            .map(|(rater, score)| (rater.to_string(), *score))
            .collect();
        let consensus = crate::scoring::consensus_score(raters.values().copied());
        let mut political = PoliticalScores::new();
        political.insert(language.to_string(), LanguageScores { raters, consensus });
        record.political_scores = Some(political);
        record
    }

    #[test]
    fn test_summary_means_skip_unknown() {
        let records = vec![
            scored("Left", "rater_a", "en", &[("rater_a", Some(2.0)), ("rater_b", None)]),
            scored("Left", "rater_b", "en", &[("rater_a", Some(4.0)), ("rater_b", Some(1.0))]),
        ];

        let rows = score_summary(&records);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].rater, "rater_a");
        assert_eq!(rows[0].mean_score, 3.0);
        assert_eq!(rows[0].samples, 2);
        assert_eq!(rows[1].rater, "rater_b");
        assert_eq!(rows[1].samples, 1);
    }

    #[test]
    fn test_summary_never_reports_consensus_as_rater() {
        let records = vec![scored("Right", "rater_a", "de", &[("rater_a", Some(5.0))])];
        let rows = score_summary(&records);
        assert!(rows.iter().all(|row| row.rater != "consensus"));
    }

    #[test]
    fn test_unscored_records_are_ignored() {
        let records = vec![ItemRecord::new("Universal", "Ethics", "rater_a", "q")];
        assert!(score_summary(&records).is_empty());
    }

    #[test]
    fn test_contributions_count_origin_raters() {
        let records = vec![
            ItemRecord::new("Universal", "Ethics", "rater_a", "q1"),
            ItemRecord::new("Universal", "Ethics", "rater_a", "q2"),
            ItemRecord::new("Universal", "Ethics", "rater_b", "q3"),
            ItemRecord::new("Partisanship", "Left", "rater_b", "q4"),
        ];

        let counts = contributions(&records);
        assert_eq!(counts["Universal → Ethics"]["rater_a"], 2);
        assert_eq!(counts["Universal → Ethics"]["rater_b"], 1);
        assert_eq!(counts["Partisanship → Left"]["rater_b"], 1);
    }
}
