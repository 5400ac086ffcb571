//! Shared types for the aggregation pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::parser::ParsedValue;
use crate::records::ItemRecord;

/// Number of points on the Likert agreement scale.
pub const LIKERT_POINTS: usize = 5;

/// Mapping that leaves a Likert answer unchanged.
pub const IDENTITY_MAPPING: [f64; LIKERT_POINTS] = [1.0, 2.0, 3.0, 4.0, 5.0];

/// Identifies the group an item is ranked within.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    pub category: String,
    pub subcategory: String,
}

impl GroupKey {
    pub fn new(category: impl Into<String>, subcategory: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            subcategory: subcategory.into(),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} → {}", self.category, self.subcategory)
    }
}

/// Items sharing a (category, subcategory).
///
/// An item's id is its index in `items`.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub key: GroupKey,
    pub items: Vec<ItemRecord>,
}

impl Group {
    /// Number of items; every rank array for this group must have this length.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Split records into groups, in order of first appearance.
///
/// Items keep their relative order inside each group.
pub fn group_records(records: &[ItemRecord]) -> Vec<Group> {
    let mut groups: Vec<Group> = Vec::new();

    for record in records {
        let key = record.group_key();
        match groups.iter_mut().find(|g| g.key == key) {
            Some(group) => group.items.push(record.clone()),
            None => groups.push(Group {
                key,
                items: vec![record.clone()],
            }),
        }
    }

    groups
}

/// The outcome of asking one rater one prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct RaterResponse {
    /// Which rater answered
    pub rater_id: String,

    /// Raw reply text, absent on transport failure
    pub raw_text: Option<String>,

    /// Structured value extracted from the reply, absent on parse failure
    pub parsed: Option<ParsedValue>,
}

impl RaterResponse {
    /// A response for a call that never produced text.
    pub fn failed(rater_id: impl Into<String>) -> Self {
        Self {
            rater_id: rater_id.into(),
            raw_text: None,
            parsed: None,
        }
    }
}
