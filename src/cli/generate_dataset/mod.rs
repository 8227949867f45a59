//! Generate-dataset command - builds golden examples from the ingested docs

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use tracing::info;

use crate::build_services;
use crate::config::AppConfig;
use crate::domain::evaluation::GOLDEN_QUESTIONS;
use crate::domain::vector_store::VectorStore;
use crate::infrastructure::evaluation::{write_examples, DatasetGenerator, DatasetGeneratorConfig};

#[derive(Args, Clone, Debug, Default)]
pub struct GenerateDatasetArgs {
    /// Output file, overriding `evaluation.dataset_path`
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Answers sampled per question, overriding `evaluation.samples`
    #[arg(long)]
    pub samples: Option<usize>,
}

pub async fn run(config: AppConfig, args: GenerateDatasetArgs) -> anyhow::Result<()> {
    let services = build_services(&config)?;
    let store: Arc<dyn VectorStore> = services.store.clone();

    let generator = DatasetGenerator::new(
        services.llm.clone(),
        store,
        services.hub.clone(),
        DatasetGeneratorConfig {
            model: config.llm.model.clone(),
            prompt_name: config.prompt.name.clone(),
            retriever_k: config.rag.retriever_k,
            samples: args.samples.unwrap_or(config.evaluation.samples).max(1),
        },
    );

    let examples = generator.generate(&GOLDEN_QUESTIONS).await?;

    let output = args.output.unwrap_or(config.evaluation.dataset_path);
    write_examples(&output, &examples).await?;

    info!(examples = examples.len(), path = %output.display(), "Wrote golden dataset");
    Ok(())
}
