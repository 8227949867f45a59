//! LLM-as-judge evaluators

use std::sync::Arc;

use crate::domain::evaluation::{
    correctness_prompt, off_topic_messages, off_topic_schema, parse_judge_output, Feedback,
    OffTopicVerdict,
};
use crate::domain::llm::{LlmProvider, LlmRequest};
use crate::domain::DomainError;

/// Default judge model
pub const DEFAULT_JUDGE_MODEL: &str = "gpt-4o";

/// Scores a predicted answer against the reference with the key-claims rubric
#[derive(Debug, Clone)]
pub struct CorrectnessJudge {
    llm: Arc<dyn LlmProvider>,
    model: String,
}

impl CorrectnessJudge {
    pub fn new(llm: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
        }
    }

    pub async fn evaluate(
        &self,
        question: &str,
        reference: &str,
        predicted: &str,
    ) -> Result<Feedback, DomainError> {
        let prompt = correctness_prompt(question, reference, predicted)?;
        let request = LlmRequest::builder().user(prompt).temperature(0.0).build();

        let response = self.llm.chat(&self.model, request).await?;
        Ok(parse_judge_output(response.content()))
    }
}

/// Labels questions that fall outside the documentation's scope
#[derive(Debug, Clone)]
pub struct OffTopicJudge {
    llm: Arc<dyn LlmProvider>,
    model: String,
}

impl OffTopicJudge {
    pub fn new(llm: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
        }
    }

    pub async fn evaluate(&self, question: &str) -> Result<Feedback, DomainError> {
        let request = LlmRequest::builder()
            .messages(off_topic_messages(question)?)
            .json_schema("off_topic_verdict", off_topic_schema())
            .temperature(0.0)
            .build();

        let response = self.llm.chat(&self.model, request).await?;
        let verdict: OffTopicVerdict = serde_json::from_str(response.content()).map_err(|e| {
            DomainError::provider(
                self.llm.provider_name(),
                format!("Off-topic judge returned invalid JSON: {}", e),
            )
        })?;

        Ok(verdict.into_feedback())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::evaluation::{CORRECTNESS_KEY, OFF_TOPIC_KEY};
    use crate::domain::llm::{LlmResponse, Message, MockLlmProvider, ResponseFormat};

    fn llm(content: &str) -> Arc<MockLlmProvider> {
        Arc::new(MockLlmProvider::new("mock").with_response(LlmResponse::new(
            "resp-1",
            "gpt-4o",
            Message::assistant(content),
        )))
    }

    #[tokio::test]
    async fn test_correctness_judge_parses_score() {
        let llm = llm("Key claims: 1. 100 rps\nMissing: none\nScore: 1.0");
        let judge = CorrectnessJudge::new(llm.clone(), DEFAULT_JUDGE_MODEL);

        let feedback = judge
            .evaluate("Rate limit?", "100 rps (api/payments.md)", "It is 100 rps.")
            .await
            .unwrap();

        assert_eq!(feedback.key, CORRECTNESS_KEY);
        assert_eq!(feedback.score, 1.0);

        let (model, request) = &llm.requests()[0];
        assert_eq!(model, "gpt-4o");
        assert_eq!(request.temperature, Some(0.0));
        assert!(request.messages[0].content_text().contains("Predicted answer: It is 100 rps."));
    }

    #[tokio::test]
    async fn test_off_topic_judge_uses_structured_output() {
        let llm = llm(r#"{"reasoning": "Asks for a poem", "off_topic": true}"#);
        let judge = OffTopicJudge::new(llm.clone(), DEFAULT_JUDGE_MODEL);

        let feedback = judge.evaluate("Write me a poem").await.unwrap();

        assert_eq!(feedback.key, OFF_TOPIC_KEY);
        assert_eq!(feedback.score, 1.0);
        assert_eq!(feedback.comment, "Asks for a poem");
        assert!(matches!(
            llm.requests()[0].1.response_format,
            Some(ResponseFormat::JsonSchema { .. })
        ));
    }

    #[tokio::test]
    async fn test_off_topic_judge_rejects_invalid_json() {
        let judge = OffTopicJudge::new(llm("not json"), DEFAULT_JUDGE_MODEL);
        let result = judge.evaluate("Anything").await;
        assert!(matches!(result, Err(DomainError::Provider { .. })));
    }
}
