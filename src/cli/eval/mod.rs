//! Eval command - runs a prompt version against the golden dataset

use std::path::PathBuf;

use anyhow::bail;
use clap::Args;
use tracing::{info, warn};

use crate::build_services;
use crate::config::AppConfig;
use crate::domain::evaluation::{experiment_name, GoldenExample, CORRECTNESS_KEY, OFF_TOPIC_KEY};
use crate::domain::prompt::PromptRef;
use crate::domain::tracking::TrackingClient;
use crate::domain::DomainError;
use crate::infrastructure::evaluation::{
    read_examples, write_summary, CorrectnessJudge, ExperimentRunner, OffTopicJudge,
};

#[derive(Args, Clone, Debug, Default)]
pub struct EvalArgs {
    /// Prompt tag to evaluate, overriding `prompt.tag`
    #[arg(long)]
    pub tag: Option<String>,

    /// Experiment name prefix, defaults to `eval-<tag>`
    #[arg(long)]
    pub prefix: Option<String>,

    /// Read examples from a local file instead of the tracking service
    #[arg(long)]
    pub dataset_file: Option<PathBuf>,

    /// Also score whether each question is off topic
    #[arg(long)]
    pub off_topic: bool,

    /// Examples evaluated in parallel, overriding `evaluation.concurrency`
    #[arg(long)]
    pub concurrency: Option<usize>,
}

pub async fn run(config: AppConfig, args: EvalArgs) -> anyhow::Result<()> {
    let services = build_services(&config)?;

    let tag = args.tag.clone().unwrap_or_else(|| config.prompt.tag.clone());
    let prefix = args.prefix.clone().unwrap_or_else(|| format!("eval-{}", tag));
    let prompt = PromptRef::new(config.prompt.name.clone(), tag);

    let (dataset, examples) = load_examples(&config, services.tracking.as_deref(), &args).await?;
    if examples.is_empty() {
        bail!("Dataset '{}' has no examples", dataset);
    }

    let judge_model = config.evaluation.judge_model.clone();
    let mut runner = ExperimentRunner::new(
        services.llm.clone(),
        services.hub.clone(),
        config.llm.model.clone(),
        CorrectnessJudge::new(services.llm.clone(), judge_model.clone()),
    )
    .with_concurrency(args.concurrency.unwrap_or(config.evaluation.concurrency));
    if args.off_topic {
        runner = runner.with_off_topic(OffTopicJudge::new(services.llm.clone(), judge_model));
    }

    let summary = runner
        .run(experiment_name(&prefix), &prompt, &dataset, examples)
        .await?;
    let path = write_summary(&config.evaluation.results_dir, &summary).await?;

    if summary.error_count() > 0 {
        warn!(errors = summary.error_count(), "Some examples failed");
    }
    info!(
        experiment = %summary.name,
        prompt = %summary.prompt,
        correctness = ?summary.mean_score(CORRECTNESS_KEY),
        off_topic = ?summary.mean_score(OFF_TOPIC_KEY),
        results = %path.display(),
        "Experiment complete"
    );
    Ok(())
}

/// Examples from `--dataset-file`, the tracking service, or the local dataset file
async fn load_examples(
    config: &AppConfig,
    tracking: Option<&dyn TrackingClient>,
    args: &EvalArgs,
) -> Result<(String, Vec<GoldenExample>), DomainError> {
    if let Some(path) = &args.dataset_file {
        return Ok((path.display().to_string(), read_examples(path).await?));
    }

    match tracking {
        Some(tracking) => {
            let name = config.evaluation.dataset_name.clone();
            let examples = tracking.list_examples(&name).await?;
            Ok((name, examples))
        }
        None => {
            let path = &config.evaluation.dataset_path;
            info!(path = %path.display(), "No tracking service configured, using local dataset");
            Ok((path.display().to_string(), read_examples(path).await?))
        }
    }
}
