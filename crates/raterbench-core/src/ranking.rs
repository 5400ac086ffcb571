//! Ranking aggregation.
//!
//! Raters rank every question of a group from 1 (best) to n (worst). Their
//! arrays are accepted on length alone, tallied per item, and reduced to a
//! mean rank:
//!
//! - an entry that does not name a position in `1..=n` is skipped
//! - an item an assignment says nothing about is not penalized
//! - an item nobody placed scores `+inf` and sorts last
//! - ties keep input order
//!
//! Duplicate positions inside one array are tolerated. Only the count is
//! checked on ingest.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::parser::{parse, ExpectedShape, ParsedValue};
use crate::types::Group;

/// How a rank array is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingLayout {
    /// Entry `i` is the rank position of item `i + 1`.
    #[default]
    PositionsByItem,

    /// Entry at position `p` names the 1-based item ranked `p`.
    ItemsByPosition,
}

/// One rater's accepted rank array for a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RankAssignment(Vec<JsonValue>);

impl RankAssignment {
    pub fn entries(&self) -> &[JsonValue] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Rank positions this assignment gives each item (one slot per item).
    fn positions(&self, n: usize, layout: RankingLayout) -> Vec<Vec<usize>> {
        let mut slots = vec![Vec::new(); n];

        for (index, entry) in self.0.iter().enumerate() {
            let Some(reference) = in_range(entry, n) else {
                continue;
            };
            match layout {
                RankingLayout::PositionsByItem => {
                    if let Some(slot) = slots.get_mut(index) {
                        slot.push(reference);
                    }
                }
                RankingLayout::ItemsByPosition => slots[reference - 1].push(index + 1),
            }
        }

        slots
    }
}

/// Rater → accepted rank array, as persisted per group.
pub type RankingArtifact = BTreeMap<String, RankAssignment>;

/// An item with its aggregate rank.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedItem<'a, T> {
    /// Index of the item in its group
    pub id: usize,
    pub item: &'a T,
    /// Mean of collected positions, `+inf` when none were collected
    pub mean_rank: f64,
}

/// Accept a parsed rank array for a group of `n` items.
///
/// Only the length is validated.
pub fn accept_ranking(values: Vec<JsonValue>, n: usize) -> Option<RankAssignment> {
    if values.len() != n {
        tracing::debug!(got = values.len(), expected = n, "Rank array has the wrong length");
        return None;
    }
    Some(RankAssignment(values))
}

/// Extract and accept a rank array from rater text.
pub fn parse_ranking(raw_text: &str, n: usize) -> Option<RankAssignment> {
    parse(raw_text, ExpectedShape::JsonArray)
        .and_then(ParsedValue::into_array)
        .and_then(|values| accept_ranking(values, n))
}

/// Mean rank per item across assignments.
///
/// Assignments whose length is not `n` are ignored entirely.
pub fn mean_ranks<'a, I>(n: usize, assignments: I, layout: RankingLayout) -> Vec<f64>
where
    I: IntoIterator<Item = &'a RankAssignment>,
{
    let mut collected: Vec<Vec<usize>> = vec![Vec::new(); n];

    for assignment in assignments.into_iter().filter(|a| a.len() == n) {
        for (slot, positions) in collected.iter_mut().zip(assignment.positions(n, layout)) {
            slot.extend(positions);
        }
    }

    collected
        .iter()
        .map(|positions| {
            if positions.is_empty() {
                f64::INFINITY
            } else {
                positions.iter().sum::<usize>() as f64 / positions.len() as f64
            }
        })
        .collect()
}

/// Order a group's items by mean rank, best first.
///
/// Returns nothing when no assignment was accepted for the group.
pub fn aggregate_ranks<'a, 'r, T, I>(
    items: &'a [T],
    assignments: I,
    layout: RankingLayout,
) -> Vec<RankedItem<'a, T>>
where
    I: IntoIterator<Item = &'r RankAssignment>,
{
    let n = items.len();
    let accepted: Vec<&RankAssignment> = assignments
        .into_iter()
        .filter(|a| a.len() == n)
        .collect();

    if accepted.is_empty() {
        return Vec::new();
    }

    let scores = mean_ranks(n, accepted, layout);
    let mut ranked: Vec<RankedItem<'a, T>> = items
        .iter()
        .zip(scores)
        .enumerate()
        .map(|(id, (item, mean_rank))| RankedItem { id, item, mean_rank })
        .collect();

    // sort_by is stable, so ties keep input order
    ranked.sort_by(|a, b| a.mean_rank.total_cmp(&b.mean_rank));
    ranked
}

/// The winning prefix of a ranked group.
pub fn top_n<T: Clone>(ranked: &[RankedItem<'_, T>], n: usize) -> Vec<T> {
    ranked.iter().take(n).map(|r| r.item.clone()).collect()
}

/// Positions one rater gave to its own questions versus everyone else's.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelfPreference {
    pub self_positions: Vec<usize>,
    pub other_positions: Vec<usize>,
}

impl SelfPreference {
    pub fn mean_self(&self) -> Option<f64> {
        mean(&self.self_positions)
    }

    pub fn mean_other(&self) -> Option<f64> {
        mean(&self.other_positions)
    }
}

/// Compare how raters rank their own questions against others'.
///
/// Each group is paired with the ranking artifact saved for it. Only accepted
/// (right-length) assignments count.
pub fn self_preference<'a, I>(groups: I, layout: RankingLayout) -> BTreeMap<String, SelfPreference>
where
    I: IntoIterator<Item = (&'a Group, &'a RankingArtifact)>,
{
    let mut preferences: BTreeMap<String, SelfPreference> = BTreeMap::new();

    for (group, artifact) in groups {
        let n = group.len();
        for (rater, assignment) in artifact.iter().filter(|(_, a)| a.len() == n) {
            let entry = preferences.entry(rater.clone()).or_default();
            for (item, positions) in group.items.iter().zip(assignment.positions(n, layout)) {
                if item.origin_rater() == rater {
                    entry.self_positions.extend(positions);
                } else {
                    entry.other_positions.extend(positions);
                }
            }
        }
    }

    preferences
}

/// A 1-based reference within `1..=n`, or `None`.
fn in_range(entry: &JsonValue, n: usize) -> Option<usize> {
    let value = usize::try_from(entry.as_u64()?).ok()?;
    (1..=n).contains(&value).then_some(value)
}

fn mean(values: &[usize]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<usize>() as f64 / values.len() as f64)
    }
}
