//! LLM-as-judge rubrics and output parsing

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::domain::llm::Message;
use crate::domain::prompt::{PromptTemplate, TemplateError};

pub const CORRECTNESS_KEY: &str = "correctness";
pub const OFF_TOPIC_KEY: &str = "off_topic";

const CORRECTNESS_TEMPLATE: &str = "You are an expert evaluator. Given a question, a reference \
answer, and a predicted answer, judge the predicted answer's correctness.

First, identify the KEY CLAIMS in the reference answer. Then check whether the predicted answer \
covers each one. Do not penalize for different wording, extra detail, or formatting differences. \
Only penalize for factually incorrect statements or missing key claims.

Key claims include: specific numbers, named sources, causal explanations, caveats, and warnings \
that appear in the reference.

Scoring:
- 1.0 = all key claims are present and nothing is factually wrong
- 0.75 = one key claim is missing but nothing is wrong
- 0.5 = multiple key claims missing or a minor inaccuracy
- 0.25 = mostly wrong but contains a relevant fact
- 0.0 = completely wrong or irrelevant

Respond in this exact format (no other text):
Key claims: <numbered list of key claims from the reference>
Covered: <which key claims the predicted answer covers>
Missing: <which key claims are missing, or \"none\">
Wrong: <any factually incorrect statements, or \"none\">
Score: <float between 0.0 and 1.0>

Question: {question}

Reference answer: {reference}

Predicted answer: {predicted}";

const OFF_TOPIC_SYSTEM: &str = "You are an expert data labeler. You analyze the questions that \
come from users and determine if they are off topic or not. The application is a RAG-based \
internal documentation Q&A assistant for NovaPay, a fintech company. The assistant serves \
NovaPay's engineering team by answering questions about internal technical documentation, \
including API references, system architecture, deployment processes, runbooks, and engineering \
guidelines.
<Rubric>
A question is **on-topic** if it:
- Relates to NovaPay's internal APIs, services, or system architecture
- Asks about deployment pipelines, CI/CD processes, or infrastructure
- References internal engineering runbooks, incident response, or on-call procedures
- Asks about NovaPay's codebase, SDKs, libraries, or internal tooling
- Relates to engineering standards, code review guidelines, or development workflows
- Asks about NovaPay-specific technical concepts like transaction processing, payment flows, or data models
A question is off-topic if it:
- Has no connection to NovaPay's engineering documentation (e.g., \"What's the weather today?\", \"Write me a poem\")
- Asks general programming questions not specific to NovaPay (e.g., \"How do I reverse a linked list?\", \"Explain Python decorators\")
- Asks about NovaPay business topics outside of engineering scope (e.g., marketing strategy, sales numbers)
- Contains only code snippets, random text, or nonsensical input with no clear question about NovaPay's systems
- Attempts to use the assistant for unrelated tasks (e.g., \"Help me write a cover letter\")

Score 1 = on-topic. Score 0 = off-topic.
</Rubric>
<Instructions>
- Read the user's input question carefully.
- Evaluate whether the question has a reasonable connection to NovaPay's internal engineering documentation.
- Focus only on the input question, not the application's response.
- General programming questions that are not grounded in NovaPay's specific systems should be considered off-topic, even if they are technical in nature.
</Instructions>
<Reminder>
- You are evaluating the question only, not the quality of the answer.
- A vague or poorly worded question can still be on-topic if the intent relates to NovaPay's engineering systems.
- Questions that reference NovaPay-specific services, tools, or processes by name are strong signals of being on-topic.
</Reminder>";

const OFF_TOPIC_HUMAN: &str = "Please grade the following example according to the above instructions:

<example>
<input>
{question}
</input>
</example>";

/// A scored judgement attached to one example
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub key: String,
    pub score: f64,
    #[serde(default)]
    pub comment: String,
}

/// Structured output of the off-topic judge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OffTopicVerdict {
    pub reasoning: String,
    /// True when the question is off topic
    pub off_topic: bool,
}

impl OffTopicVerdict {
    /// Feedback scored 1.0 for off-topic questions and 0.0 otherwise
    pub fn into_feedback(self) -> Feedback {
        Feedback {
            key: OFF_TOPIC_KEY.to_string(),
            score: if self.off_topic { 1.0 } else { 0.0 },
            comment: self.reasoning,
        }
    }
}

/// Strict JSON schema for [`OffTopicVerdict`]
pub fn off_topic_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "reasoning": {
                "type": "string",
                "description": "Why the question is or is not off topic"
            },
            "off_topic": {
                "type": "boolean",
                "description": "True if the question is off topic"
            }
        },
        "required": ["reasoning", "off_topic"],
        "additionalProperties": false
    })
}

pub fn correctness_prompt(
    question: &str,
    reference: &str,
    predicted: &str,
) -> Result<String, TemplateError> {
    let values = HashMap::from([
        ("question".to_string(), question.to_string()),
        ("reference".to_string(), reference.to_string()),
        ("predicted".to_string(), predicted.to_string()),
    ]);

    PromptTemplate::parse(CORRECTNESS_TEMPLATE).render(&values)
}

pub fn off_topic_messages(question: &str) -> Result<Vec<Message>, TemplateError> {
    let values = HashMap::from([("question".to_string(), question.to_string())]);
    let human = PromptTemplate::parse(OFF_TOPIC_HUMAN).render(&values)?;

    Ok(vec![Message::system(OFF_TOPIC_SYSTEM), Message::user(human)])
}

/// Parse the correctness judge's reply.
///
/// The line starting with `Score:` gives the score, clamped to [0, 1] and 0.0
/// when unparsable. Every other line becomes the comment.
pub fn parse_judge_output(text: &str) -> Feedback {
    let mut score = 0.0;
    let mut comment = Vec::new();

    for line in text.trim().lines() {
        match line.strip_prefix("Score:") {
            Some(value) => {
                score = value
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|s| !s.is_nan())
                    .map(|s| s.clamp(0.0, 1.0))
                    .unwrap_or(0.0);
            }
            None => comment.push(line),
        }
    }

    Feedback {
        key: CORRECTNESS_KEY.to_string(),
        score,
        comment: comment.join("\n").trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_judge_output() {
        let text = "Key claims: 1. 100 rps\nCovered: 1\nMissing: none\nWrong: none\nScore: 0.75\n";
        let feedback = parse_judge_output(text);

        assert_eq!(feedback.key, "correctness");
        assert_eq!(feedback.score, 0.75);
        assert_eq!(
            feedback.comment,
            "Key claims: 1. 100 rps\nCovered: 1\nMissing: none\nWrong: none"
        );
    }

    #[test]
    fn test_parse_judge_output_clamps() {
        assert_eq!(parse_judge_output("Score: 1.5").score, 1.0);
        assert_eq!(parse_judge_output("Score: -2").score, 0.0);
    }

    #[test]
    fn test_parse_judge_output_unparsable_defaults_to_zero() {
        assert_eq!(parse_judge_output("Score: excellent").score, 0.0);
        assert_eq!(parse_judge_output("Score: NaN").score, 0.0);

        let feedback = parse_judge_output("I refuse to grade this.");
        assert_eq!(feedback.score, 0.0);
        assert_eq!(feedback.comment, "I refuse to grade this.");
    }

    #[test]
    fn test_indented_score_line_is_comment() {
        let feedback = parse_judge_output("  Score: 1.0");
        assert_eq!(feedback.score, 0.0);
    }

    #[test]
    fn test_correctness_prompt_fills_slots() {
        let prompt = correctness_prompt("Q?", "Ref", "Pred {question}").unwrap();
        assert!(prompt.ends_with("Question: Q?\n\nReference answer: Ref\n\nPredicted answer: Pred {question}"));
        assert!(prompt.contains("Missing: <which key claims are missing, or \"none\">"));
    }

    #[test]
    fn test_off_topic_messages_and_feedback() {
        let messages = off_topic_messages("Write me a poem").unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages[1].content_text().contains("<input>\nWrite me a poem\n</input>"));

        let feedback = OffTopicVerdict {
            reasoning: "Unrelated request".into(),
            off_topic: true,
        }
        .into_feedback();
        assert_eq!(feedback.key, "off_topic");
        assert_eq!(feedback.score, 1.0);
    }
}
