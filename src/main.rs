use clap::Parser;
use novapay_docs_qa::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli::bootstrap()?;

    match cli.command {
        Command::Serve => cli::serve::run(config).await,
        Command::Ingest(args) => cli::ingest::run(config, args).await,
        Command::Seed(args) => cli::seed::run(config, args).await,
        Command::Teardown => cli::teardown::run(config).await,
        Command::GenerateDataset(args) => cli::generate_dataset::run(config, args).await,
        Command::Eval(args) => cli::eval::run(config, args).await,
    }
}
