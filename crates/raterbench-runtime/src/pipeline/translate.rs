//! Translation of final questions into every configured language.

use raterbench_core::ItemRecord;

use super::StageError;
use crate::config::PipelineConfig;
use crate::prompts::translation_prompt;
use crate::rater::RaterPanel;

/// Translate each question with the configured translator rater.
///
/// The source language entry is the question itself. A failed translation
/// is recorded as `null`; translations already present are kept.
pub async fn translate(
    panel: &RaterPanel,
    config: &PipelineConfig,
    mut records: Vec<ItemRecord>,
) -> Result<Vec<ItemRecord>, StageError> {
    let translator = panel
        .rater(&config.translator)
        .ok_or_else(|| StageError::TranslatorUnavailable(config.translator.clone()))?;

    for record in records.iter_mut() {
        let mut translations = record.translations.take().unwrap_or_default();
        translations.insert(config.source_language.clone(), Some(record.question.clone()));

        for (code, name) in &config.languages {
            if code == &config.source_language || matches!(translations.get(code), Some(Some(_))) {
                continue;
            }

            let prompt = translation_prompt(&record.question, name);
            let translated = panel
                .ask_raw(translator.as_ref(), &prompt)
                .await
                .filter(|text| !text.trim().is_empty());

            if translated.is_none() {
                tracing::warn!(
                    rater = %translator.id(),
                    language = %code,
                    category = %record.category,
                    subcategory = %record.subcategory,
                    "Translation failed"
                );
            }
            translations.insert(code.clone(), translated);
        }

        record.translations = Some(translations);
    }

    Ok(records)
}
