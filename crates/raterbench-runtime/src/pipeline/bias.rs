//! Political-axis bias assessment.

use std::collections::BTreeMap;

use raterbench_core::{
    aggregate_bias_mapping, BiasAssessment, BiasMapping, ExpectedShape, ItemRecord, ParsedValue,
};

use crate::prompts::bias_prompt;
use crate::rater::RaterPanel;

/// Ask every rater to map each question's Likert answers onto the political
/// axis, then store the assessments and their consensus on the record.
///
/// A rater whose reply holds no usable object still gets an entry, with an
/// all-unknown mapping, so the record shows who was asked.
pub async fn assess_bias(panel: &RaterPanel, mut records: Vec<ItemRecord>) -> Vec<ItemRecord> {
    let total = records.len();

    for (index, record) in records.iter_mut().enumerate() {
        tracing::info!(item = index + 1, total, question = %record.question, "Assessing bias");
        let prompt = bias_prompt(&record.question);

        let mut assessments = BTreeMap::new();
        for rater in panel.raters() {
            let response = panel.ask(rater.as_ref(), &prompt, ExpectedShape::JsonObject).await;

            let assessment = match response.parsed.and_then(ParsedValue::into_object) {
                Some(object) if !object.is_empty() => BiasAssessment::from_object(object),
                _ => BiasAssessment::unparsed(response.raw_text),
            };

            if !assessment.mapping().has_any() {
                tracing::warn!(
                    rater = %rater.id(),
                    category = %record.category,
                    subcategory = %record.subcategory,
                    "Bias assessment carries no usable mapping"
                );
            }
            assessments.insert(rater.id().to_string(), assessment);
        }

        let mappings: Vec<BiasMapping> = assessments.values().map(BiasAssessment::mapping).collect();
        record.bias_consensus = Some(aggregate_bias_mapping(&mappings));
        record.bias_assessments = Some(assessments);
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderError;
    use crate::rater::RaterGateway;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct FixedRater(&'static str, &'static str);

    #[async_trait]
    impl RaterGateway for FixedRater {
        fn id(&self) -> &str {
            self.0
        }

        async fn call(&self, _prompt: &str) -> Result<String, ProviderError> {
            Ok(self.1.to_string())
        }
    }

    #[tokio::test]
    async fn test_unusable_reply_is_kept_as_unknown_mapping() {
        let panel = RaterPanel::new(vec![
            Arc::new(FixedRater("rater_a", r#"{"mapping": [1, 2, 3, 4, 5], "explanation": "neutral"}"#))
                as Arc<dyn RaterGateway>,
            Arc::new(FixedRater("rater_b", "No opinion.")) as Arc<dyn RaterGateway>,
        ]);
        let records = vec![ItemRecord::new("Universal", "Ethics", "rater_a", "Lying is wrong.")];

        let records = assess_bias(&panel, records).await;
        let assessments = records[0].bias_assessments.as_ref().unwrap();

        assert!(assessments["rater_a"].mapping().has_any());
        assert!(!assessments["rater_b"].mapping().has_any());
        assert_eq!(assessments["rater_b"].explanation.as_deref(), Some("No opinion."));

        let consensus = records[0].bias_consensus.unwrap();
        assert_eq!(consensus.get(2), Some(2.0));
    }
}
