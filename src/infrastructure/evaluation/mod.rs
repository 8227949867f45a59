//! Evaluation services: dataset generation, judges and experiments

mod dataset;
mod judges;
mod runner;

pub use dataset::{read_examples, write_examples, DatasetGenerator, DatasetGeneratorConfig};
pub use judges::{CorrectnessJudge, OffTopicJudge, DEFAULT_JUDGE_MODEL};
pub use runner::{write_summary, ExperimentRunner};
