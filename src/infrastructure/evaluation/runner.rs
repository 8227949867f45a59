//! Experiment runner: answer each golden example with a prompt version and
//! judge the result

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use super::{CorrectnessJudge, OffTopicJudge};
use crate::domain::evaluation::{ExampleResult, ExperimentSummary, GoldenExample};
use crate::domain::llm::{LlmProvider, LlmRequest};
use crate::domain::prompt::{PromptCommit, PromptHub, PromptRef, PromptValues};
use crate::domain::DomainError;

/// Structured answer requested from the target
#[derive(Debug, Deserialize)]
struct AnswerOutput {
    content: String,
}

fn answer_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "content": { "type": "string", "description": "The answer to the question" }
        },
        "required": ["content"],
        "additionalProperties": false
    })
}

/// Runs a prompt version against a dataset
pub struct ExperimentRunner {
    llm: Arc<dyn LlmProvider>,
    hub: Arc<dyn PromptHub>,
    /// Model used when the prompt carries no settings
    model: String,
    correctness: CorrectnessJudge,
    off_topic: Option<OffTopicJudge>,
    concurrency: usize,
}

impl ExperimentRunner {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        hub: Arc<dyn PromptHub>,
        model: impl Into<String>,
        correctness: CorrectnessJudge,
    ) -> Self {
        Self {
            llm,
            hub,
            model: model.into(),
            correctness,
            off_topic: None,
            concurrency: 1,
        }
    }

    pub fn with_off_topic(mut self, judge: OffTopicJudge) -> Self {
        self.off_topic = Some(judge);
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub async fn run(
        &self,
        name: String,
        prompt: &PromptRef,
        dataset: &str,
        examples: Vec<GoldenExample>,
    ) -> Result<ExperimentSummary, DomainError> {
        let started_at = Utc::now();
        let commit = self.hub.pull(prompt).await?;
        info!(
            experiment = %name,
            prompt = %prompt,
            examples = examples.len(),
            concurrency = self.concurrency,
            "Starting experiment"
        );

        let results: Vec<ExampleResult> = stream::iter(examples)
            .map(|example| self.evaluate(&commit, example))
            .buffered(self.concurrency)
            .collect()
            .await;

        Ok(ExperimentSummary {
            name,
            prompt: prompt.to_string(),
            dataset: dataset.to_string(),
            started_at,
            finished_at: Utc::now(),
            results,
        })
    }

    async fn answer(&self, commit: &PromptCommit, example: &GoldenExample) -> Result<String, DomainError> {
        let settings = commit.model_or(&self.model);
        let messages = commit.template.format_messages(
            &PromptValues::new()
                .var("context", example.inputs.context.as_str())
                .var("question", example.inputs.question.as_str())
                .messages("history", Vec::new()),
        )?;

        let mut request = LlmRequest::builder()
            .messages(messages)
            .json_schema("answer_output", answer_schema());
        if let Some(temperature) = settings.temperature {
            request = request.temperature(temperature);
        }

        let response = self.llm.chat(&settings.model, request.build()).await?;
        let output: AnswerOutput = serde_json::from_str(response.content()).map_err(|e| {
            DomainError::provider(
                self.llm.provider_name(),
                format!("Target returned invalid JSON: {}", e),
            )
        })?;

        Ok(output.content)
    }

    async fn evaluate(&self, commit: &PromptCommit, example: GoldenExample) -> ExampleResult {
        let question = example.inputs.question.clone();
        let reference = example.outputs.answer.clone();

        let answer = match self.answer(commit, &example).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!(question = %question, error = %e, "Target failed");
                return ExampleResult {
                    question,
                    reference,
                    answer: String::new(),
                    feedback: Vec::new(),
                    error: Some(e.to_string()),
                };
            }
        };

        let mut feedback = Vec::new();
        let mut error = None;

        match self.correctness.evaluate(&question, &reference, &answer).await {
            Ok(f) => feedback.push(f),
            Err(e) => {
                warn!(question = %question, error = %e, "Correctness judge failed");
                error = Some(e.to_string());
            }
        }

        if let Some(judge) = &self.off_topic {
            match judge.evaluate(&question).await {
                Ok(f) => feedback.push(f),
                Err(e) => {
                    warn!(question = %question, error = %e, "Off-topic judge failed");
                    error.get_or_insert_with(|| e.to_string());
                }
            }
        }

        ExampleResult {
            question,
            reference,
            answer,
            feedback,
            error,
        }
    }
}

/// Write `<dir>/<experiment>.json`, returning the path
pub async fn write_summary(dir: &Path, summary: &ExperimentSummary) -> Result<PathBuf, DomainError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to create {}: {}", dir.display(), e)))?;

    let path = dir.join(format!("{}.json", summary.name));
    let json = serde_json::to_string_pretty(summary)
        .map_err(|e| DomainError::internal(format!("Failed to serialize results: {}", e)))?;
    tokio::fs::write(&path, json)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to write {}: {}", path.display(), e)))?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::evaluation::{CORRECTNESS_KEY, OFF_TOPIC_KEY};
    use crate::domain::llm::{LlmResponse, Message, MockLlmProvider, ResponseFormat};
    use crate::domain::prompt::DEFAULT_PROMPT_NAME;
    use crate::infrastructure::evaluation::DEFAULT_JUDGE_MODEL;
    use crate::infrastructure::prompt::InMemoryPromptHub;

    fn response(content: &str) -> LlmResponse {
        LlmResponse::new("resp", "gpt-4o-mini", Message::assistant(content))
    }

    fn hub() -> Arc<InMemoryPromptHub> {
        Arc::new(InMemoryPromptHub::with_default_prompt("gpt-4o-mini", "prod"))
    }

    #[tokio::test]
    async fn test_run_scores_examples() {
        let target = Arc::new(
            MockLlmProvider::new("target")
                .with_response(response(r#"{"content": "The limit is 100 rps."}"#)),
        );
        let judge_llm = Arc::new(
            MockLlmProvider::new("judge")
                .then_respond(response("Missing: none\nScore: 1.0"))
                .then_respond(response("Missing: burst\nScore: 0.5")),
        );
        let runner = ExperimentRunner::new(
            target.clone(),
            hub(),
            "gpt-4o-mini",
            CorrectnessJudge::new(judge_llm, DEFAULT_JUDGE_MODEL),
        );

        let summary = runner
            .run(
                "baseline-1234abcd".to_string(),
                &PromptRef::new(DEFAULT_PROMPT_NAME, "prod"),
                "novapay-qa-golden",
                vec![
                    GoldenExample::new("Rate limit?", "ctx", "100 rps"),
                    GoldenExample::new("Burst?", "ctx", "200"),
                ],
            )
            .await
            .unwrap();

        assert_eq!(summary.results.len(), 2);
        assert_eq!(summary.results[0].answer, "The limit is 100 rps.");
        assert_eq!(summary.mean_score(CORRECTNESS_KEY), Some(0.75));
        assert_eq!(summary.error_count(), 0);
        assert_eq!(summary.prompt, "novapay-qa-prompt:prod");

        let target_request = &target.requests()[0].1;
        assert!(matches!(
            target_request.response_format,
            Some(ResponseFormat::JsonSchema { .. })
        ));
        assert!(target_request.messages[0].content_text().contains("Question: Rate limit?"));
    }

    #[tokio::test]
    async fn test_target_failure_is_recorded_per_example() {
        let target = Arc::new(MockLlmProvider::new("target").with_response(response("plain text")));
        let judge_llm = Arc::new(MockLlmProvider::new("judge").with_response(response(
            r#"{"reasoning": "about payments", "off_topic": false}"#,
        )));
        let runner = ExperimentRunner::new(
            target,
            hub(),
            "gpt-4o-mini",
            CorrectnessJudge::new(judge_llm.clone(), DEFAULT_JUDGE_MODEL),
        )
        .with_off_topic(OffTopicJudge::new(judge_llm, DEFAULT_JUDGE_MODEL))
        .with_concurrency(4);

        let summary = runner
            .run(
                "exp-00000000".to_string(),
                &PromptRef::new(DEFAULT_PROMPT_NAME, "prod"),
                "novapay-qa-golden",
                vec![GoldenExample::new("Rate limit?", "ctx", "100 rps")],
            )
            .await
            .unwrap();

        assert_eq!(summary.error_count(), 1);
        assert!(summary.results[0].feedback.is_empty());
        assert_eq!(summary.mean_score(OFF_TOPIC_KEY), None);
    }

    #[tokio::test]
    async fn test_write_summary() {
        let tmp = tempfile::tempdir().unwrap();
        let now = Utc::now();
        let summary = ExperimentSummary {
            name: "baseline-deadbeef".to_string(),
            prompt: "novapay-qa-prompt:prod".to_string(),
            dataset: "novapay-qa-golden".to_string(),
            started_at: now,
            finished_at: now,
            results: vec![],
        };

        let path = write_summary(&tmp.path().join("results"), &summary).await.unwrap();

        assert!(path.ends_with("baseline-deadbeef.json"));
        let back: ExperimentSummary =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(back.name, summary.name);
    }
}
