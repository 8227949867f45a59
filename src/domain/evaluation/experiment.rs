//! Experiment results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Feedback;

/// `{prefix}-{8 hex chars}`
pub fn experiment_name(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", prefix, &id[..8])
}

/// Outcome of running the target and judges on one example
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExampleResult {
    pub question: String,
    pub reference: String,
    pub answer: String,
    pub feedback: Vec<Feedback>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExampleResult {
    pub fn score(&self, key: &str) -> Option<f64> {
        self.feedback.iter().find(|f| f.key == key).map(|f| f.score)
    }
}

/// Aggregated experiment output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentSummary {
    pub name: String,
    pub prompt: String,
    pub dataset: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub results: Vec<ExampleResult>,
}

impl ExperimentSummary {
    /// Mean score for a feedback key over examples that carry it
    pub fn mean_score(&self, key: &str) -> Option<f64> {
        let scores: Vec<f64> = self.results.iter().filter_map(|r| r.score(key)).collect();
        if scores.is_empty() {
            return None;
        }
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    }

    pub fn error_count(&self) -> usize {
        self.results.iter().filter(|r| r.error.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::evaluation::CORRECTNESS_KEY;

    fn result(score: Option<f64>) -> ExampleResult {
        ExampleResult {
            question: "Q".into(),
            reference: "R".into(),
            answer: "A".into(),
            feedback: score
                .map(|score| Feedback {
                    key: CORRECTNESS_KEY.into(),
                    score,
                    comment: String::new(),
                })
                .into_iter()
                .collect(),
            error: score.is_none().then(|| "target failed".to_string()),
        }
    }

    #[test]
    fn test_experiment_name() {
        let name = experiment_name("baseline");
        assert!(name.starts_with("baseline-"));
        let suffix = &name["baseline-".len()..];
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_mean_score_skips_missing() {
        let now = Utc::now();
        let summary = ExperimentSummary {
            name: "baseline-0000abcd".into(),
            prompt: "novapay-qa-prompt:prod".into(),
            dataset: "novapay-qa-golden".into(),
            started_at: now,
            finished_at: now,
            results: vec![result(Some(1.0)), result(Some(0.5)), result(None)],
        };

        assert_eq!(summary.mean_score(CORRECTNESS_KEY), Some(0.75));
        assert_eq!(summary.mean_score("off_topic"), None);
        assert_eq!(summary.error_count(), 1);
    }
}
