//! Pipeline driver.
//!
//! Stages run strictly in order, one record and one rater call at a time:
//!
//! ```text
//! generate → rank → assess-bias → translate → respond → score → report
//! ```
//!
//! Each stage reads the previous stage's file, adds fields to the records
//! and writes the next file. A missing or schema-invalid input file fails
//! the stage before any rater is called. Everything that goes wrong inside
//! a stage (one rater timing out, one reply not parsing) is logged and
//! recorded as `null`.

use std::fmt;
use std::path::{Path, PathBuf};

use raterbench_core::{load_records, save_records, RecordError};
use serde::Serialize;
use thiserror::Error;

use crate::config::{ConfigError, PipelineConfig};
use crate::rater::RaterPanel;

pub mod bias;
pub mod generate;
pub mod rank;
pub mod report;
pub mod respond;
pub mod score;
pub mod translate;

/// Errors that stop a stage.
#[derive(Error, Debug)]
pub enum StageError {
    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid category file {}: {reason}", path.display())]
    Categories { path: PathBuf, reason: String },

    #[error("No raters available for the {0} stage")]
    NoRaters(Stage),

    #[error("Translator '{0}' is not available")]
    TranslatorUnavailable(String),
}

/// One pipeline step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Generate,
    Rank,
    AssessBias,
    Translate,
    Respond,
    Score,
    Report,
}

impl Stage {
    /// Every stage in pipeline order.
    pub const ALL: [Stage; 7] = [
        Stage::Generate,
        Stage::Rank,
        Stage::AssessBias,
        Stage::Translate,
        Stage::Respond,
        Stage::Score,
        Stage::Report,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Generate => "generate",
            Stage::Rank => "rank",
            Stage::AssessBias => "assess-bias",
            Stage::Translate => "translate",
            Stage::Respond => "respond",
            Stage::Score => "score",
            Stage::Report => "report",
        }
    }

    /// Whether the stage calls raters at all.
    pub fn needs_raters(&self) -> bool {
        !matches!(self, Stage::Score | Stage::Report)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a finished stage did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageSummary {
    pub stage: Stage,
    /// Records (or subcategories, for generate) read
    pub input: usize,
    /// Records written
    pub output: usize,
    pub path: PathBuf,
}

/// Runs stages against one config and one rater panel.
#[derive(Debug)]
pub struct PipelineDriver {
    config: PipelineConfig,
    panel: RaterPanel,
    resume: bool,
}

impl PipelineDriver {
    pub fn new(config: PipelineConfig, panel: RaterPanel) -> Self {
        Self {
            config,
            panel,
            resume: false,
        }
    }

    /// Let the respond stage continue from its own output file when present.
    pub fn with_resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn panel(&self) -> &RaterPanel {
        &self.panel
    }

    /// Run every stage in order, stopping at the first fatal error.
    pub async fn run_all(&self) -> Result<Vec<StageSummary>, StageError> {
        let mut summaries = Vec::with_capacity(Stage::ALL.len());
        for stage in Stage::ALL {
            summaries.push(self.run(stage).await?);
        }
        Ok(summaries)
    }

    /// Run one stage.
    pub async fn run(&self, stage: Stage) -> Result<StageSummary, StageError> {
        tracing::info!(stage = %stage, raters = ?self.panel.ids(), "Starting stage");
        self.panel.ledger().reset();

        let paths = &self.config.paths;
        let summary = match stage {
            Stage::Generate => {
                let categories = generate::load_categories(&paths.categories)?;
                self.require_raters(stage)?;
                let records =
                    generate::generate(&self.panel, &categories, self.config.questions_per_rater)
                        .await;
                self.write(stage, categories.values().map(Vec::len).sum(), &records, &paths.generated)?
            }
            Stage::Rank => {
                let records = load_records(&paths.generated)?;
                self.require_raters(stage)?;
                let ranked = rank::rank(
                    &self.panel,
                    &records,
                    self.config.ranking_layout,
                    self.config.top_n,
                    &paths.rankings_dir,
                )
                .await?;
                self.write(stage, records.len(), &ranked, &paths.final_set)?
            }
            Stage::AssessBias => {
                let records = load_records(&paths.final_set)?;
                self.require_raters(stage)?;
                let assessed = bias::assess_bias(&self.panel, records).await;
                self.write(stage, assessed.len(), &assessed, &paths.with_bias)?
            }
            Stage::Translate => {
                let records = load_records(&paths.with_bias)?;
                self.require_raters(stage)?;
                let translated = translate::translate(&self.panel, &self.config, records).await?;
                self.write(stage, translated.len(), &translated, &paths.translated)?
            }
            Stage::Respond => {
                let input = if self.resume && paths.responses.exists() {
                    tracing::info!(path = %paths.responses.display(), "Resuming from existing responses");
                    &paths.responses
                } else {
                    &paths.translated
                };
                let records = load_records(input)?;
                self.require_raters(stage)?;
                let responded = respond::collect_responses(&self.panel, &self.config, records).await;
                self.write(stage, responded.len(), &responded, &paths.responses)?
            }
            Stage::Score => {
                let records = load_records(&paths.responses)?;
                let scored = score::score(records, self.config.mapping_preference);
                self.write(stage, scored.len(), &scored, &paths.mapped)?
            }
            Stage::Report => {
                let records = load_records(&paths.mapped)?;
                let ranked_groups = report::load_ranked_groups(&paths.generated, &paths.rankings_dir)?;
                let report = report::build_report(&records, &ranked_groups, self.config.ranking_layout);
                raterbench_core::save_json(&paths.report, &report)?;
                StageSummary {
                    stage,
                    input: records.len(),
                    output: report.score_summary.len(),
                    path: paths.report.clone(),
                }
            }
        };

        if stage.needs_raters() {
            self.panel.ledger().log_summary(stage.name());
        }
        tracing::info!(
            stage = %stage,
            input = summary.input,
            output = summary.output,
            path = %summary.path.display(),
            "Stage finished"
        );
        Ok(summary)
    }

    fn require_raters(&self, stage: Stage) -> Result<(), StageError> {
        if self.panel.is_empty() {
            return Err(StageError::NoRaters(stage));
        }
        Ok(())
    }

    fn write(
        &self,
        stage: Stage,
        input: usize,
        records: &[raterbench_core::ItemRecord],
        path: &Path,
    ) -> Result<StageSummary, StageError> {
        save_records(path, records)?;
        Ok(StageSummary {
            stage,
            input,
            output: records.len(),
            path: path.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_and_names() {
        let names: Vec<&str> = Stage::ALL.iter().map(Stage::name).collect();
        assert_eq!(
            names,
            vec!["generate", "rank", "assess-bias", "translate", "respond", "score", "report"]
        );
        assert!(Stage::Generate < Stage::Report);
    }

    #[test]
    fn test_only_llm_stages_need_raters() {
        assert!(Stage::Respond.needs_raters());
        assert!(!Stage::Score.needs_raters());
        assert!(!Stage::Report.needs_raters());
    }

    #[tokio::test]
    async fn test_missing_input_fails_before_rater_check() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = PipelineConfig::default();
        config.paths = config.paths.rooted_at(dir.path());

        let driver = PipelineDriver::new(config, RaterPanel::new(Vec::new()));
        let result = driver.run(Stage::Rank).await;
        assert!(matches!(result, Err(StageError::Record(RecordError::Missing(_)))));
    }

    #[tokio::test]
    async fn test_empty_panel_is_fatal_for_llm_stages() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = PipelineConfig::default();
        config.paths = config.paths.rooted_at(dir.path());
        save_records(&config.paths.generated, &[]).unwrap();

        let driver = PipelineDriver::new(config, RaterPanel::new(Vec::new()));
        let result = driver.run(Stage::Rank).await;
        assert!(matches!(result, Err(StageError::NoRaters(Stage::Rank))));
    }
}
