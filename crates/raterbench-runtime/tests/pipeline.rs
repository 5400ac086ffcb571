//! End-to-end stage runs against scripted raters and a temporary data tree.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use raterbench_core::{load_json, load_records, RankingArtifact};
use raterbench_runtime::pipeline::report::Report;
use raterbench_runtime::{
    PipelineConfig, PipelineDriver, ProviderError, RaterConfig, RaterGateway, RaterPanel, Stage,
    StageError,
};

type Script = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// A rater that answers by looking at what kind of prompt it got.
struct ScriptedRater {
    id: String,
    script: Script,
    calls: AtomicUsize,
}

impl ScriptedRater {
    fn new(id: &str, script: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            script: Box::new(script),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RaterGateway for ScriptedRater {
    fn id(&self) -> &str {
        &self.id
    }

    async fn call(&self, prompt: &str) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.script)(prompt).ok_or_else(|| ProviderError::Timeout(std::time::Duration::from_secs(30)))
    }
}

fn rater_a(prompt: &str) -> Option<String> {
    if prompt.contains("Write exactly") {
        Some(r#"[{"question": "A first?"}, {"question": "A second?"}]"#.to_string())
    } else if prompt.contains("You are ranking") {
        Some(r#"{"ranking": [1, 2, 3, 4]}"#.to_string())
    } else if prompt.contains("political leaning") {
        Some(r#"{"mapping": [5, 4, 3, 2, 1], "explanation": "Agreeing leans left."}"#.to_string())
    } else if prompt.starts_with("Translate the following text into German.") {
        let text = prompt.lines().find_map(|l| l.strip_prefix("Text: "))?;
        Some(format!("[de] {text}"))
    } else if prompt.starts_with("Answer the following question") {
        Some("4".to_string())
    } else {
        None
    }
}

fn rater_b(prompt: &str) -> Option<String> {
    if prompt.contains("Write exactly") {
        Some(r#"Sure! [{"question": "B first?"}, {"question": "B second?"}]"#.to_string())
    } else if prompt.contains("You are ranking") {
        Some(r#"{"ranking": [2, 1, 4, 3]}"#.to_string())
    } else if prompt.contains("political leaning") {
        Some("I cannot classify this question.".to_string())
    } else if prompt.starts_with("Answer the following question in German") {
        Some("Vielleicht".to_string())
    } else if prompt.starts_with("Answer the following question") {
        Some("4".to_string())
    } else {
        None
    }
}

fn config_in(root: &Path) -> PipelineConfig {
    let mut config = PipelineConfig {
        raters: vec![
            RaterConfig::new("rater_a", "scripted", "a-1"),
            RaterConfig::new("rater_b", "scripted", "b-1"),
        ],
        translator: "rater_a".to_string(),
        languages: BTreeMap::from([
            ("en".to_string(), "English".to_string()),
            ("de".to_string(), "German".to_string()),
        ]),
        questions_per_rater: 2,
        top_n: 2,
        ..PipelineConfig::default()
    };
    config.paths = config.paths.rooted_at(root);
    config.validate().unwrap();

    std::fs::create_dir_all(config.paths.categories.parent().unwrap()).unwrap();
    std::fs::write(&config.paths.categories, r#"{"Universal": ["Ethics"]}"#).unwrap();
    config
}

fn scripted_panel() -> (RaterPanel, Arc<ScriptedRater>, Arc<ScriptedRater>) {
    let a = ScriptedRater::new("rater_a", rater_a);
    let b = ScriptedRater::new("rater_b", rater_b);
    let panel = RaterPanel::new(vec![
        a.clone() as Arc<dyn RaterGateway>,
        b.clone() as Arc<dyn RaterGateway>,
    ]);
    (panel, a, b)
}

#[tokio::test]
async fn test_full_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let paths = config.paths.clone();
    let (panel, _, _) = scripted_panel();
    let driver = PipelineDriver::new(config, panel);

    let summaries = driver.run_all().await.unwrap();
    assert_eq!(summaries.len(), Stage::ALL.len());

    let generated = load_records(&paths.generated).unwrap();
    assert_eq!(generated.len(), 4);
    assert_eq!(generated[2].model, "rater_b");

    // Mean ranks 1.5, 1.5, 3.5, 3.5: the tie keeps generation order
    let final_set = load_records(&paths.final_set).unwrap();
    let kept: Vec<&str> = final_set.iter().map(|r| r.question.as_str()).collect();
    assert_eq!(kept, vec!["A first?", "A second?"]);

    let artifact: RankingArtifact =
        load_json(paths.rankings_dir.join("Universal_Ethics_rankings.json")).unwrap();
    assert_eq!(artifact.len(), 2);

    let with_bias = load_records(&paths.with_bias).unwrap();
    let assessments = with_bias[0].bias_assessments.as_ref().unwrap();
    assert!(assessments["rater_a"].mapping().has_any());
    assert!(!assessments["rater_b"].mapping().has_any());
    assert_eq!(
        assessments["rater_b"].explanation.as_deref(),
        Some("I cannot classify this question.")
    );
    assert_eq!(with_bias[0].bias_consensus.unwrap().get(4), Some(2.0));

    let translated = load_records(&paths.translated).unwrap();
    let translations = translated[0].translations.as_ref().unwrap();
    assert_eq!(translations["en"].as_deref(), Some("A first?"));
    assert_eq!(translations["de"].as_deref(), Some("[de] A first?"));

    let responses = load_records(&paths.responses).unwrap();
    let table = responses[0].responses.as_ref().unwrap();
    assert_eq!(table["en"]["rater_b"], Some(4));
    assert_eq!(table["de"]["rater_b"], None);

    let mapped = load_records(&paths.mapped).unwrap();
    let scores = mapped[0].political_scores.as_ref().unwrap();
    assert_eq!(scores["en"].raters["rater_a"], Some(2.0));
    assert_eq!(scores["en"].consensus, Some(2.0));
    assert_eq!(scores["de"].raters["rater_b"], None);
    assert_eq!(scores["de"].consensus, Some(2.0));

    let report: Report = load_json(&paths.report).unwrap();
    assert_eq!(report.records, 2);
    assert_eq!(report.score_summary.len(), 3);
    assert_eq!(report.contributions["Universal → Ethics"]["rater_a"], 2);

    let a = &report.self_preference["rater_a"];
    assert_eq!(a.mean_self_rank, Some(1.5));
    assert_eq!(a.mean_other_rank, Some(3.5));
    let b = &report.self_preference["rater_b"];
    assert_eq!(b.mean_self_rank, Some(3.5));
}

#[tokio::test]
async fn test_missing_upstream_file_calls_no_rater() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let (panel, a, b) = scripted_panel();
    let driver = PipelineDriver::new(config, panel);

    let result = driver.run(Stage::AssessBias).await;
    assert!(matches!(result, Err(StageError::Record(_))));
    assert_eq!(a.calls() + b.calls(), 0);
}

#[tokio::test]
async fn test_failing_raters_still_write_output() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let paths = config.paths.clone();

    let silent = ScriptedRater::new("rater_a", |_| None);
    let driver = PipelineDriver::new(config, RaterPanel::new(vec![silent.clone() as Arc<dyn RaterGateway>]));

    let summary = driver.run(Stage::Generate).await.unwrap();
    assert_eq!(summary.output, 0);
    assert_eq!(silent.calls(), 1);
    assert!(load_records(&paths.generated).unwrap().is_empty());
    assert_eq!(driver.panel().ledger().snapshot()["rater_a"].failures, 1);
}

#[tokio::test]
async fn test_translator_must_be_on_panel() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let paths = config.paths.clone();
    raterbench_core::save_records(&paths.with_bias, &[]).unwrap();

    let only_b = ScriptedRater::new("rater_b", rater_b);
    let driver = PipelineDriver::new(config, RaterPanel::new(vec![only_b as Arc<dyn RaterGateway>]));

    let result = driver.run(Stage::Translate).await;
    assert!(matches!(result, Err(StageError::TranslatorUnavailable(ref id)) if id == "rater_a"));
}

#[tokio::test]
async fn test_resumed_respond_only_fills_gaps() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let (panel, a, b) = scripted_panel();
    let driver = PipelineDriver::new(config, panel).with_resume(true);

    for stage in [Stage::Generate, Stage::Rank, Stage::AssessBias, Stage::Translate, Stage::Respond] {
        driver.run(stage).await.unwrap();
    }
    let before = a.calls() + b.calls();

    driver.run(Stage::Respond).await.unwrap();
    assert_eq!(a.calls() + b.calls(), before);
}
