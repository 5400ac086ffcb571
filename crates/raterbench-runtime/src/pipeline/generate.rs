//! Question generation.
//!
//! Every rater writes questions for every subcategory. Replies are parsed
//! leniently: a JSON array of `{"question": ...}` objects, or a single such
//! object. Entries without a non-empty `question` string are dropped.

use std::collections::BTreeMap;
use std::path::Path;

use raterbench_core::{load_json, ExpectedShape, ItemRecord, ParsedValue, RecordError};
use serde_json::Value as JsonValue;

use super::StageError;
use crate::prompts::generation_prompt;
use crate::rater::RaterPanel;

/// Category name → subcategory names.
pub type Categories = BTreeMap<String, Vec<String>>;

/// Load the category file.
pub fn load_categories(path: &Path) -> Result<Categories, StageError> {
    let categories: Categories = load_json(path).map_err(|e| match e {
        RecordError::Json { source, .. } => StageError::Categories {
            path: path.to_path_buf(),
            reason: source.to_string(),
        },
        other => StageError::Record(other),
    })?;

    if categories.values().all(Vec::is_empty) {
        return Err(StageError::Categories {
            path: path.to_path_buf(),
            reason: "no subcategories defined".to_string(),
        });
    }
    Ok(categories)
}

/// Ask every rater for `n` questions per subcategory.
pub async fn generate(panel: &RaterPanel, categories: &Categories, n: usize) -> Vec<ItemRecord> {
    let mut records = Vec::new();

    for (category, subcategories) in categories {
        for subcategory in subcategories {
            tracing::info!(%category, %subcategory, "Generating questions");
            let prompt = generation_prompt(category, subcategory, n);

            for rater in panel.raters() {
                let response = panel.ask(rater.as_ref(), &prompt, ExpectedShape::JsonAny).await;
                let questions = response.parsed.map(extract_questions).unwrap_or_default();

                if questions.is_empty() {
                    tracing::warn!(
                        rater = %rater.id(),
                        %category,
                        %subcategory,
                        "No questions generated"
                    );
                    continue;
                }

                records.extend(
                    questions
                        .into_iter()
                        .map(|q| ItemRecord::new(category, subcategory, rater.id(), q)),
                );
            }
        }
    }

    records
}

/// Pull question texts out of a generation reply.
pub fn extract_questions(parsed: ParsedValue) -> Vec<String> {
    match parsed {
        ParsedValue::Array(values) => values.iter().filter_map(question_text).collect(),
        ParsedValue::Object(object) => question_text(&JsonValue::Object(object))
            .into_iter()
            .collect(),
        ParsedValue::Integer(_) => Vec::new(),
    }
}

fn question_text(value: &JsonValue) -> Option<String> {
    let text = value.get("question")?.as_str()?.trim();
    (!text.is_empty()).then(|| text.to_string())
}
