//! raterbench: run the multi-rater survey pipeline one stage at a time.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use raterbench_runtime::{PipelineConfig, PipelineDriver, ProviderRegistry, RaterPanel, Stage};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "raterbench", version, about = "Multi-rater LLM survey pipeline")]
struct Cli {
    /// Pipeline config (YAML); built-in defaults when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Resolve every data path under this directory
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Disable the in-memory reply cache
    #[arg(long, global = true)]
    no_cache: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask every rater for questions per subcategory
    Generate,
    /// Rank questions within each group and keep the top ones
    Rank,
    /// Ask every rater how each answer maps onto the political axis
    AssessBias,
    /// Translate final questions into the configured languages
    Translate,
    /// Collect Likert answers from every rater in every language
    Respond {
        /// Continue from an existing responses file, asking only missing pairs
        #[arg(long)]
        resume: bool,
    },
    /// Map answers to political scores
    Score,
    /// Summarize scores, contributions and self preference
    Report,
    /// Run every stage in order
    All,
}

fn main() {
    init_tracing();

    if let Err(err) = run() {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

#[tokio::main]
async fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(root) = &cli.root {
        config.paths = config.paths.rooted_at(root);
    }
    if cli.no_cache {
        config.cache.enabled = false;
    }

    let registry = ProviderRegistry::with_defaults();
    let panel = RaterPanel::from_config(&config, &registry);
    tracing::info!(raters = ?panel.ids(), providers = ?registry.available_types(), "Rater panel ready");

    let (stages, resume) = match cli.command {
        Commands::Generate => (vec![Stage::Generate], false),
        Commands::Rank => (vec![Stage::Rank], false),
        Commands::AssessBias => (vec![Stage::AssessBias], false),
        Commands::Translate => (vec![Stage::Translate], false),
        Commands::Respond { resume } => (vec![Stage::Respond], resume),
        Commands::Score => (vec![Stage::Score], false),
        Commands::Report => (vec![Stage::Report], false),
        Commands::All => (Stage::ALL.to_vec(), false),
    };

    let driver = PipelineDriver::new(config, panel).with_resume(resume);
    for stage in stages {
        let summary = driver
            .run(stage)
            .await
            .with_context(|| format!("{stage} stage failed"))?;
        println!("{}", serde_json::to_string(&summary)?);
    }

    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_stage_subcommands() {
        let cli = Cli::parse_from(["raterbench", "--config", "pipeline.yaml", "assess-bias"]);
        assert_eq!(cli.config, Some(PathBuf::from("pipeline.yaml")));
        assert!(matches!(cli.command, Commands::AssessBias));

        let cli = Cli::parse_from(["raterbench", "respond", "--resume", "--root", "/tmp/run"]);
        assert!(matches!(cli.command, Commands::Respond { resume: true }));
        assert_eq!(cli.root, Some(PathBuf::from("/tmp/run")));
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
