//! CLI for NovaPay Docs Q&A
//!
//! - `serve`: run the HTTP API
//! - `ingest`: rebuild the vector store from the docs directory
//! - `seed` / `teardown`: manage tracking-service resources
//! - `generate-dataset` / `eval`: build the golden dataset and run experiments

pub mod eval;
pub mod generate_dataset;
pub mod ingest;
pub mod seed;
pub mod serve;
pub mod teardown;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::infrastructure::logging;

/// NovaPay Docs Q&A - RAG assistant over internal engineering docs
#[derive(Parser)]
#[command(name = "novapay-docs-qa")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API server
    Serve,

    /// Load, chunk and embed the markdown docs into the vector store
    Ingest(ingest::IngestArgs),

    /// Push the default prompt and create the golden dataset
    Seed(seed::SeedArgs),

    /// Delete all prompts, datasets, annotation queues and projects
    Teardown,

    /// Build golden examples and write them to a JSON file
    GenerateDataset(generate_dataset::GenerateDatasetArgs),

    /// Run a correctness experiment against the golden dataset
    Eval(eval::EvalArgs),
}

/// Load `.env` and configuration, then install logging
pub fn bootstrap() -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    logging::init_logging(&config.logging);

    Ok(config)
}
