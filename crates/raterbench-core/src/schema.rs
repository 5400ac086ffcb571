//! JSON Schema validation for record files.
//!
//! Stage input files are validated against `schema/item_records.schema.json`
//! before any record is deserialized, so a malformed upstream file fails the
//! stage with every violation listed instead of the first serde error.

use std::sync::OnceLock;

/// Embedded record schema (loaded at compile time).
const RECORDS_SCHEMA_JSON: &str = include_str!("../schema/item_records.schema.json");

/// Compiled JSON Schema validator (initialized once, reused).
static COMPILED_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

fn get_validator() -> Result<&'static jsonschema::Validator, String> {
    let result = COMPILED_SCHEMA.get_or_init(|| {
        let schema_value: serde_json::Value = serde_json::from_str(RECORDS_SCHEMA_JSON)
            .map_err(|e| format!("Invalid schema JSON: {}", e))?;

        jsonschema::options()
            .build(&schema_value)
            .map_err(|e| format!("Failed to compile schema: {}", e))
    });

    result.as_ref().map_err(Clone::clone)
}

/// Validate a record file's JSON value against the schema.
///
/// Returns every violation as `"<message> at <instance path>"`.
pub fn validate_records_schema(records_json: &serde_json::Value) -> Result<(), Vec<String>> {
    let validator = get_validator().map_err(|e| vec![e])?;

    let errors: Vec<String> = validator
        .iter_errors(records_json)
        .map(|e| format!("{} at {}", e, e.instance_path))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_generated_records_pass() {
        let value = json!([
            {
                "category": "Partisanship",
                "subcategory": "Left",
                "model": "openai_gpt4o",
                "question": "Public transit should be free."
            }
        ]);
        assert!(validate_records_schema(&value).is_ok());
    }

    #[test]
    fn test_fully_augmented_record_passes() {
        let value = json!([
            {
                "category": "Universal",
                "subcategory": "Ethics",
                "model": "google_gemini",
                "question": "q",
                "bias_assessments": {
                    "openai_gpt4o": { "mapping": [5, 4, 3, 2, 1], "explanation": "inverse" },
                    "google_gemini": { "mapping": [null, null, null, null, null], "explanation": null }
                },
                "bias_consensus": [5.0, 4.0, 3.0, 2.0, 1.0],
                "translations": { "en": "q", "de": null },
                "responses": { "en": { "openai_gpt4o": 4, "google_gemini": null } },
                "political_scores": { "en": { "openai_gpt4o": 2.0, "google_gemini": null, "consensus": 2.0 } }
            }
        ]);
        assert!(validate_records_schema(&value).is_ok());
    }

    #[test]
    fn test_not_an_array_fails() {
        let value = json!({ "category": "Universal" });
        assert!(validate_records_schema(&value).is_err());
    }

    #[test]
    fn test_missing_question_fails() {
        let value = json!([
            { "category": "Universal", "subcategory": "Ethics", "model": "rater_a" }
        ]);
        let errors = validate_records_schema(&value).unwrap_err();
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_short_consensus_fails() {
        let value = json!([
            {
                "category": "Universal",
                "subcategory": "Ethics",
                "model": "rater_a",
                "question": "q",
                "bias_consensus": [1.0, 2.0]
            }
        ]);
        assert!(validate_records_schema(&value).is_err());
    }

    #[test]
    fn test_non_integer_response_fails() {
        let value = json!([
            {
                "category": "Universal",
                "subcategory": "Ethics",
                "model": "rater_a",
                "question": "q",
                "responses": { "en": { "rater_a": "agree" } }
            }
        ]);
        assert!(validate_records_schema(&value).is_err());
    }
}
