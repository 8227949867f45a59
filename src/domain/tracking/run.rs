//! Run traces posted to the tracking project
//!
//! A chat request produces one root run with a child run per pipeline stage.
//! Runs carry the session's `thread_id` so the tracking service can group a
//! conversation into one thread.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[cfg(test)]
use mockall::automock;

use crate::domain::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunType {
    Chain,
    Retriever,
    Tool,
}

/// One finished run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: String,
    pub trace_id: String,
    /// Sort key: ancestors' keys joined with `.`, each `{start}Z{id}`
    pub dotted_order: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_run_id: Option<String>,
    pub name: String,
    pub run_type: RunType,
    pub inputs: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub extra: Value,
}

impl RunRecord {
    fn start(name: &str, run_type: RunType, inputs: Value, parent: Option<&RunRecord>, extra: Value) -> Self {
        let id = uuid::Uuid::new_v4().to_string();
        let start_time = Utc::now();
        let key = format!("{}{}", start_time.format("%Y%m%dT%H%M%S%6fZ"), id);

        let (trace_id, dotted_order, parent_run_id) = match parent {
            Some(parent) => (
                parent.trace_id.clone(),
                format!("{}.{}", parent.dotted_order, key),
                Some(parent.id.clone()),
            ),
            None => (id.clone(), key, None),
        };

        Self {
            id,
            trace_id,
            dotted_order,
            parent_run_id,
            name: name.to_string(),
            run_type,
            inputs,
            outputs: None,
            error: None,
            start_time,
            end_time: None,
            extra,
        }
    }

    pub fn finish(mut self, outputs: Value) -> Self {
        self.outputs = Some(outputs);
        self.end_time = Some(Utc::now());
        self
    }

    pub fn fail(mut self, error: &DomainError) -> Self {
        self.error = Some(error.to_string());
        self.end_time = Some(Utc::now());
        self
    }
}

/// Runs recorded while answering one question
#[derive(Debug, Clone)]
pub struct RunTrace {
    root: RunRecord,
    children: Vec<RunRecord>,
}

impl RunTrace {
    pub fn new(name: &str, inputs: Value, thread_id: Option<&str>) -> Self {
        let extra = match thread_id {
            Some(id) => json!({ "metadata": { "thread_id": id } }),
            None => json!({ "metadata": {} }),
        };

        Self {
            root: RunRecord::start(name, RunType::Chain, inputs, None, extra),
            children: Vec::new(),
        }
    }

    /// Start a stage run under the root
    pub fn child(&self, name: &str, run_type: RunType, inputs: Value) -> RunRecord {
        RunRecord::start(name, run_type, inputs, Some(&self.root), self.root.extra.clone())
    }

    /// Finish `run` from a stage result, mapping the success value with `outputs`
    pub fn record<T>(
        &mut self,
        run: RunRecord,
        result: &Result<T, DomainError>,
        outputs: impl FnOnce(&T) -> Value,
    ) {
        let run = match result {
            Ok(value) => run.finish(outputs(value)),
            Err(e) => run.fail(e),
        };
        self.children.push(run);
    }

    /// Close the root run; runs are returned root first
    pub fn finish(self, result: &Result<String, DomainError>) -> Vec<RunRecord> {
        let root = match result {
            Ok(answer) => self.root.finish(json!({ "answer": answer })),
            Err(e) => self.root.fail(e),
        };

        std::iter::once(root).chain(self.children).collect()
    }
}

/// Destination for finished runs
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RunTracer: Send + Sync {
    async fn post_runs(&self, runs: Vec<RunRecord>) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_children_share_trace_and_thread() {
        let mut trace = RunTrace::new("rag_stream", json!({ "question": "q" }), Some("t-1"));
        let run = trace.child("retrieve_documents", RunType::Retriever, json!({ "question": "q" }));
        trace.record(run, &Ok(2usize), |n| json!({ "documents": n }));

        let runs = trace.finish(&Ok("answer".to_string()));
        assert_eq!(runs.len(), 2);

        let (root, child) = (&runs[0], &runs[1]);
        assert_eq!(root.trace_id, root.id);
        assert!(root.parent_run_id.is_none());
        assert_eq!(child.trace_id, root.id);
        assert_eq!(child.parent_run_id.as_deref(), Some(root.id.as_str()));
        assert!(child.dotted_order.starts_with(&format!("{}.", root.dotted_order)));
        assert!(child.dotted_order.ends_with(&child.id));
        assert_eq!(child.extra["metadata"]["thread_id"], "t-1");
        assert_eq!(child.outputs, Some(json!({ "documents": 2 })));
        assert_eq!(root.outputs, Some(json!({ "answer": "answer" })));
        assert!(root.end_time.is_some());
    }

    #[test]
    fn test_failed_stage_records_error() {
        let mut trace = RunTrace::new("rag_query", json!({}), None);
        let run = trace.child("route_query", RunType::Chain, json!({}));
        let result: Result<(), DomainError> = Err(DomainError::provider("openai", "down"));
        trace.record(run, &result, |_| json!({}));

        let err = DomainError::internal("boom");
        let runs = trace.finish(&Err(err));
        assert!(runs[0].error.as_deref().unwrap().contains("boom"));
        assert!(runs[1].error.as_deref().unwrap().contains("down"));
        assert!(runs[1].outputs.is_none());
    }

    #[test]
    fn test_serialized_shape() {
        let trace = RunTrace::new("rag_stream", json!({ "question": "q" }), Some("t-1"));
        let json = serde_json::to_value(&trace.finish(&Ok(String::new()))[0]).unwrap();

        assert_eq!(json["run_type"], "chain");
        assert!(json.get("parent_run_id").is_none());
        assert!(json["start_time"].is_string());
    }
}
