//! Response-to-score mapping.

use raterbench_core::{score_record, ItemRecord, MappingPreference};

/// Attach political scores to every record.
///
/// Existing scores are recomputed from the responses, so running the stage
/// twice gives the same file.
pub fn score(mut records: Vec<ItemRecord>, preference: MappingPreference) -> Vec<ItemRecord> {
    for record in records.iter_mut() {
        if record.responses.is_none() {
            tracing::warn!(question = %record.question, "Record has no responses to score");
        }
        record.political_scores = Some(score_record(record, preference));
    }
    records
}
