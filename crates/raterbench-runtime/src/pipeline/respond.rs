//! Likert response collection.

use raterbench_core::{ExpectedShape, ItemRecord};

use crate::config::PipelineConfig;
use crate::prompts::response_prompt;
use crate::rater::RaterPanel;

/// Ask every rater for a Likert answer to every translation of every
/// question.
///
/// Pairs already answered (even as `null`) are left alone. Languages whose
/// translation failed are skipped.
pub async fn collect_responses(
    panel: &RaterPanel,
    config: &PipelineConfig,
    mut records: Vec<ItemRecord>,
) -> Vec<ItemRecord> {
    let total = records.len();

    for (index, record) in records.iter_mut().enumerate() {
        let Some(translations) = record.translations.clone() else {
            tracing::warn!(
                category = %record.category,
                subcategory = %record.subcategory,
                "Record has no translations; nothing to ask"
            );
            continue;
        };
        tracing::info!(item = index + 1, total, question = %record.question, "Collecting responses");

        let responses = record.responses.get_or_insert_with(Default::default);
        for (code, text) in &translations {
            let Some(text) = text else {
                tracing::warn!(language = %code, question = %record.question, "Skipping missing translation");
                continue;
            };

            let prompt = response_prompt(text, config.language_name(code));
            let answers = responses.entry(code.clone()).or_default();

            for rater in panel.raters() {
                if answers.contains_key(rater.id()) {
                    continue;
                }

                let response = panel.ask(rater.as_ref(), &prompt, ExpectedShape::Integer).await;
                let answer = response.parsed.and_then(|p| p.as_integer());
                if answer.is_none() {
                    tracing::warn!(
                        rater = %rater.id(),
                        language = %code,
                        category = %record.category,
                        subcategory = %record.subcategory,
                        "No Likert answer"
                    );
                }
                answers.insert(rater.id().to_string(), answer);
            }
        }
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderError;
    use crate::rater::RaterGateway;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Agreeable {
        id: &'static str,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RaterGateway for Agreeable {
        fn id(&self) -> &str {
            self.id
        }

        async fn call(&self, _prompt: &str) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("4".to_string())
        }
    }

    fn panel() -> (RaterPanel, Arc<Agreeable>, Arc<Agreeable>) {
        let a = Arc::new(Agreeable { id: "rater_a", calls: AtomicUsize::new(0) });
        let b = Arc::new(Agreeable { id: "rater_b", calls: AtomicUsize::new(0) });
        let panel = RaterPanel::new(vec![
            a.clone() as Arc<dyn RaterGateway>,
            b.clone() as Arc<dyn RaterGateway>,
        ]);
        (panel, a, b)
    }

    #[tokio::test]
    async fn test_null_translation_is_not_asked() {
        let (panel, a, b) = panel();
        let mut record = ItemRecord::new("Universal", "Ethics", "rater_a", "Lying is wrong.");
        record.translations = Some(BTreeMap::from([
            ("en".to_string(), Some("Lying is wrong.".to_string())),
            ("de".to_string(), None),
        ]));

        let records = collect_responses(&panel, &PipelineConfig::default(), vec![record]).await;
        let responses = records[0].responses.as_ref().unwrap();

        assert_eq!(responses.keys().collect::<Vec<_>>(), vec!["en"]);
        assert_eq!(responses["en"]["rater_a"], Some(4));
        assert_eq!(responses["en"]["rater_b"], Some(4));
        assert_eq!(a.calls.load(Ordering::SeqCst), 1);
        assert_eq!(b.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_record_without_translations_is_skipped() {
        let (panel, a, b) = panel();
        let record = ItemRecord::new("Universal", "Ethics", "rater_a", "Lying is wrong.");

        let records = collect_responses(&panel, &PipelineConfig::default(), vec![record]).await;

        assert!(records[0].responses.is_none());
        assert_eq!(a.calls.load(Ordering::SeqCst) + b.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_answered_pairs_are_not_asked_again() {
        let (panel, a, b) = panel();
        let mut record = ItemRecord::new("Universal", "Ethics", "rater_a", "Lying is wrong.");
        record.translations = Some(BTreeMap::from([("en".to_string(), Some("Lying is wrong.".to_string()))]));
        record.responses = Some(BTreeMap::from([(
            "en".to_string(),
            BTreeMap::from([("rater_a".to_string(), None)]),
        )]));

        let records = collect_responses(&panel, &PipelineConfig::default(), vec![record]).await;
        let en = &records[0].responses.as_ref().unwrap()["en"];

        assert_eq!(en["rater_a"], None);
        assert_eq!(en["rater_b"], Some(4));
        assert_eq!(a.calls.load(Ordering::SeqCst), 0);
        assert_eq!(b.calls.load(Ordering::SeqCst), 1);
    }
}
