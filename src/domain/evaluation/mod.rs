//! Evaluation domain - golden examples, judge rubrics and experiment results

mod dataset;
mod experiment;
mod judge;

pub use dataset::{
    synthesis_prompt, ExampleInputs, ExampleOutputs, GoldenExample, DATASET_DESCRIPTION,
    DATASET_NAME, GOLDEN_QUESTIONS,
};
pub use experiment::{experiment_name, ExampleResult, ExperimentSummary};
pub use judge::{
    correctness_prompt, off_topic_messages, off_topic_schema, parse_judge_output, Feedback,
    OffTopicVerdict, CORRECTNESS_KEY, OFF_TOPIC_KEY,
};
