//! Seed command - pushes the default prompt and creates the golden dataset

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::domain::evaluation::{GoldenExample, DATASET_DESCRIPTION, GOLDEN_QUESTIONS};
use crate::domain::prompt::{default_prompt_commit, PromptHub, PushOutcome};
use crate::domain::tracking::TrackingClient;
use crate::domain::vector_store::VectorStore;
use crate::domain::DomainError;
use crate::infrastructure::evaluation::{read_examples, DatasetGenerator, DatasetGeneratorConfig};
use crate::{build_services, Services};

#[derive(Args, Clone, Debug, Default)]
pub struct SeedArgs {
    /// Tags to point at the pushed prompt commit (repeatable)
    #[arg(long)]
    pub tag: Vec<String>,

    /// Golden examples file, overriding `evaluation.dataset_path`.
    /// Examples are generated when the file does not exist.
    #[arg(long)]
    pub dataset_file: Option<PathBuf>,
}

/// What to create on the tracking service
#[derive(Debug, Clone)]
pub struct SeedPlan {
    pub prompt_name: String,
    pub model: String,
    pub tags: Vec<String>,
    /// Tag the server pulls, used in the untagged warning
    pub serving_tag: String,
    pub dataset_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetOutcome {
    Created { examples: usize },
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub prompt: PushOutcome,
    pub dataset: DatasetOutcome,
    /// No tags were given, so the serving tag was not moved
    pub untagged: bool,
}

pub async fn run(config: AppConfig, args: SeedArgs) -> anyhow::Result<()> {
    let services = build_services(&config)?;
    let tracking = services
        .tracking
        .clone()
        .context("LANGSMITH_API_KEY is not set; seeding needs the tracking service")?;

    let plan = SeedPlan {
        prompt_name: config.prompt.name.clone(),
        model: config.llm.model.clone(),
        tags: args.tag,
        serving_tag: config.prompt.tag.clone(),
        dataset_name: config.evaluation.dataset_name.clone(),
    };
    let path = args
        .dataset_file
        .unwrap_or_else(|| config.evaluation.dataset_path.clone());

    let report = seed(tracking.as_ref(), services.hub.as_ref(), &plan, || {
        load_or_generate(&config, &services, &path)
    })
    .await?;

    info!(prompt = ?report.prompt, dataset = ?report.dataset, "Seed complete");
    Ok(())
}

/// Push the default prompt, then create the dataset unless it already
/// exists. `load_examples` runs only when the dataset has to be created.
pub async fn seed<F, Fut>(
    tracking: &dyn TrackingClient,
    hub: &dyn PromptHub,
    plan: &SeedPlan,
    load_examples: F,
) -> Result<SeedReport, DomainError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<GoldenExample>, DomainError>>,
{
    let prompt = hub
        .push(&plan.prompt_name, default_prompt_commit(&plan.model), plan.tags.clone())
        .await?;
    match prompt {
        PushOutcome::Created => info!(prompt = %plan.prompt_name, tags = ?plan.tags, "Pushed prompt"),
        PushOutcome::Unchanged => info!(prompt = %plan.prompt_name, "Prompt already up to date, skipped"),
    }

    let untagged = plan.tags.is_empty();
    if untagged {
        warn!(
            "No tags given. Tag a commit '{}' before serving with PROMPT_TAG={}",
            plan.serving_tag, plan.serving_tag
        );
    }

    let report = |dataset| SeedReport {
        prompt,
        dataset,
        untagged,
    };

    let exists = tracking
        .list_datasets()
        .await?
        .iter()
        .any(|d| d.name == plan.dataset_name);
    if exists {
        info!(dataset = %plan.dataset_name, "Dataset already exists, skipped");
        return Ok(report(DatasetOutcome::Skipped));
    }

    let examples = load_examples().await?;

    let dataset = match tracking.create_dataset(&plan.dataset_name, DATASET_DESCRIPTION).await {
        Ok(dataset) => dataset,
        Err(e) if e.is_conflict() => {
            info!(dataset = %plan.dataset_name, "Dataset already exists, skipped");
            return Ok(report(DatasetOutcome::Skipped));
        }
        Err(e) => return Err(e),
    };

    let created = tracking.create_examples(&dataset.id, examples).await?;
    info!(dataset = %dataset.name, examples = created, "Created dataset");
    Ok(report(DatasetOutcome::Created { examples: created }))
}

/// Examples from `path`, or freshly generated from the vector store when the
/// file does not exist
async fn load_or_generate(
    config: &AppConfig,
    services: &Services,
    path: &Path,
) -> Result<Vec<GoldenExample>, DomainError> {
    if path.exists() {
        return read_examples(path).await;
    }

    info!(path = %path.display(), "No dataset file, generating examples");
    let store: Arc<dyn VectorStore> = services.store.clone();
    let generator = DatasetGenerator::new(
        services.llm.clone(),
        store,
        services.hub.clone(),
        DatasetGeneratorConfig {
            model: config.llm.model.clone(),
            prompt_name: config.prompt.name.clone(),
            retriever_k: config.rag.retriever_k,
            samples: config.evaluation.samples.max(1),
        },
    );

    generator.generate(&GOLDEN_QUESTIONS).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::prompt::MockPromptHub;
    use crate::domain::tracking::{Dataset, MockTrackingClient};

    fn plan(tags: &[&str]) -> SeedPlan {
        SeedPlan {
            prompt_name: "team-qa".to_string(),
            model: "gpt-4o-mini".to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            serving_tag: "prod".to_string(),
            dataset_name: "novapay-qa-golden".to_string(),
        }
    }

    fn dataset(id: &str, name: &str) -> Dataset {
        Dataset {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
        }
    }

    fn hub(outcome: PushOutcome) -> MockPromptHub {
        let mut hub = MockPromptHub::new();
        hub.expect_push().times(1).returning(move |name, _, _| {
            assert_eq!(name, "team-qa");
            Ok(outcome)
        });
        hub
    }

    fn examples() -> Vec<GoldenExample> {
        vec![GoldenExample::new("Q?", "C", "A")]
    }

    #[tokio::test]
    async fn test_seed_pushes_configured_prompt_and_creates_dataset() {
        let mut hub = MockPromptHub::new();
        hub.expect_push().times(1).returning(|name, _, tags| {
            assert_eq!(name, "team-qa");
            assert_eq!(tags, vec!["prod".to_string()]);
            Ok(PushOutcome::Created)
        });
        let mut tracking = MockTrackingClient::new();
        tracking.expect_list_datasets().returning(|| Ok(vec![dataset("d0", "other")]));
        tracking
            .expect_create_dataset()
            .times(1)
            .returning(|name, _| Ok(dataset("d1", name)));
        tracking
            .expect_create_examples()
            .times(1)
            .returning(|id, examples| {
                assert_eq!(id, "d1");
                Ok(examples.len())
            });

        let report = seed(&tracking, &hub, &plan(&["prod"]), || async { Ok(examples()) })
            .await
            .unwrap();

        assert_eq!(
            report,
            SeedReport {
                prompt: PushOutcome::Created,
                dataset: DatasetOutcome::Created { examples: 1 },
                untagged: false,
            }
        );
    }

    #[tokio::test]
    async fn test_unchanged_prompt_and_existing_dataset_are_skipped() {
        let hub = hub(PushOutcome::Unchanged);
        let mut tracking = MockTrackingClient::new();
        tracking
            .expect_list_datasets()
            .returning(|| Ok(vec![dataset("d1", "novapay-qa-golden")]));
        tracking.expect_create_dataset().times(0);
        tracking.expect_create_examples().times(0);

        let report = seed(&tracking, &hub, &plan(&[]), || async {
            Err(DomainError::internal("examples should not be loaded"))
        })
        .await
        .unwrap();

        assert_eq!(report.prompt, PushOutcome::Unchanged);
        assert_eq!(report.dataset, DatasetOutcome::Skipped);
        assert!(report.untagged);
    }

    #[tokio::test]
    async fn test_dataset_conflict_on_create_is_skipped() {
        let hub = hub(PushOutcome::Created);
        let mut tracking = MockTrackingClient::new();
        tracking.expect_list_datasets().returning(|| Ok(Vec::new()));
        tracking
            .expect_create_dataset()
            .times(1)
            .returning(|_, _| Err(DomainError::conflict("dataset exists")));
        tracking.expect_create_examples().times(0);

        let report = seed(&tracking, &hub, &plan(&["prod"]), || async { Ok(examples()) })
            .await
            .unwrap();

        assert_eq!(report.dataset, DatasetOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_rate_limit_is_not_retried() {
        let mut hub = MockPromptHub::new();
        hub.expect_push()
            .times(1)
            .returning(|_, _, _| Err(DomainError::rate_limited("tracking", "slow down")));
        let tracking = MockTrackingClient::new();

        let err = seed(&tracking, &hub, &plan(&["prod"]), || async { Ok(examples()) })
            .await
            .unwrap_err();

        assert!(err.is_rate_limited());
    }
}
