//! Golden dataset of curated questions and reference answers

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::prompt::{PromptTemplate, TemplateError};

pub const DATASET_NAME: &str = "novapay-qa-golden";

pub const DATASET_DESCRIPTION: &str = "Golden evaluation set for the NovaPay docs QA RAG chain. \
10 curated question/answer pairs covering conflicting info, split-across-docs, stale-vs-current, \
documentation gaps, and straightforward retrieval. Reference outputs generated by running the \
real RAG pipeline multiple times and synthesizing.";

pub const GOLDEN_QUESTIONS: [&str; 10] = [
    "What's the rate limit on the payments API?",
    "What do I need to do before deploying?",
    "How does our auth system work?",
    "How do I configure Stripe webhooks?",
    "How do I access the billing dashboard?",
    "What are the steps for local dev setup?",
    "What happens during a database failover?",
    "What coding standards does NovaPay follow?",
    "How do I handle a payments service outage?",
    "What teams are part of NovaPay engineering?",
];

const SYNTHESIS_TEMPLATE: &str = "Below are {n} responses from a documentation QA assistant \
answering the same question with the same retrieved context. Synthesize them into a single \
reference answer that captures the most complete and accurate information across all responses. \
Keep the same style and tone: cite source documents, stay factual, and don't invent information.

Question: {question}

{responses}

Write the synthesized reference answer:";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExampleInputs {
    pub question: String,
    pub context: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExampleOutputs {
    pub answer: String,
}

/// One question with its retrieved context and reference answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoldenExample {
    pub inputs: ExampleInputs,
    pub outputs: ExampleOutputs,
}

impl GoldenExample {
    pub fn new(
        question: impl Into<String>,
        context: impl Into<String>,
        answer: impl Into<String>,
    ) -> Self {
        Self {
            inputs: ExampleInputs {
                question: question.into(),
                context: context.into(),
            },
            outputs: ExampleOutputs {
                answer: answer.into(),
            },
        }
    }
}

/// Prompt asking the model to merge several sampled answers into one
pub fn synthesis_prompt(question: &str, samples: &[String]) -> Result<String, TemplateError> {
    let responses = samples
        .iter()
        .enumerate()
        .map(|(i, sample)| format!("--- Response {} ---\n{}", i + 1, sample))
        .collect::<Vec<_>>()
        .join("\n\n");

    let values = HashMap::from([
        ("n".to_string(), samples.len().to_string()),
        ("question".to_string(), question.to_string()),
        ("responses".to_string(), responses),
    ]);

    PromptTemplate::parse(SYNTHESIS_TEMPLATE).render(&values)
}
