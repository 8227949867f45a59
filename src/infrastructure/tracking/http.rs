//! Tracking service client over its REST API
//!
//! One client serves the resource management calls used by `seed` and
//! `teardown`, the prompt hub used at query time, and run tracing. Prompt
//! manifests are stored as serialized [`PromptCommit`] values.

use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::domain::evaluation::GoldenExample;
use crate::domain::prompt::{PromptCommit, PromptHub, PromptRef, PushOutcome};
use crate::domain::tracking::{
    AnnotationQueue, Dataset, PromptRepo, RunRecord, RunTracer, TracingProject, TrackingClient,
};
use crate::domain::DomainError;
use crate::infrastructure::http_client::HttpClientTrait;

pub const DEFAULT_TRACKING_URL: &str = "https://api.smith.langchain.com";

pub const DEFAULT_PROJECT: &str = "default";

const PAGE_SIZE: usize = 100;

/// REST client for the experiment-tracking service
#[derive(Debug)]
pub struct HttpTrackingClient<C: HttpClientTrait> {
    client: C,
    api_key: String,
    base_url: String,
    /// Project that receives run traces
    project: String,
}

impl<C: HttpClientTrait> HttpTrackingClient<C> {
    pub fn new(client: C, api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            project: DEFAULT_PROJECT.to_string(),
        }
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = project.into();
        self
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![
            ("x-api-key", self.api_key.as_str()),
            ("Content-Type", "application/json"),
        ]
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    fn url_with_params(&self, path: &str, params: &[(&str, String)]) -> Result<String, DomainError> {
        Url::parse_with_params(&self.url(path), params)
            .map(String::from)
            .map_err(|e| DomainError::configuration(format!("Invalid tracking URL: {}", e)))
    }

    fn parse<T: DeserializeOwned>(value: Value, what: &str) -> Result<T, DomainError> {
        serde_json::from_value(value).map_err(|e| {
            DomainError::provider("tracking", format!("Failed to parse {}: {}", what, e))
        })
    }

    /// Fetch every page of a listing. `items` pulls the records out of one
    /// page response.
    async fn list_all<T, F>(
        &self,
        path: &str,
        mut params: Vec<(&str, String)>,
        items: F,
    ) -> Result<Vec<T>, DomainError>
    where
        T: DeserializeOwned,
        F: Fn(Value) -> Value,
    {
        let mut all = Vec::new();
        let base_len = params.len();

        loop {
            params.truncate(base_len);
            params.push(("limit", PAGE_SIZE.to_string()));
            params.push(("offset", all.len().to_string()));

            let url = self.url_with_params(path, &params)?;
            let page: Vec<T> = Self::parse(items(self.client.get_json(&url, self.headers()).await?), path)?;
            let done = page.len() < PAGE_SIZE;
            all.extend(page);

            if done {
                return Ok(all);
            }
        }
    }

    async fn dataset_by_name(&self, name: &str) -> Result<Dataset, DomainError> {
        let url = self.url_with_params("/datasets", &[("name", name.to_string())])?;
        let datasets: Vec<Dataset> =
            Self::parse(self.client.get_json(&url, self.headers()).await?, "datasets")?;

        datasets
            .into_iter()
            .find(|d| d.name == name)
            .ok_or_else(|| DomainError::not_found(format!("Dataset '{}' not found", name)))
    }

    async fn ensure_repo(&self, name: &str, description: Option<&str>) -> Result<(), DomainError> {
        let body = json!({
            "repo_handle": name,
            "is_public": false,
            "description": description.unwrap_or_default(),
        });

        match self.client.post_json(&self.url("/repos/"), self.headers(), &body).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_conflict() => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn set_tag(&self, name: &str, tag: &str, commit_hash: &str) -> Result<(), DomainError> {
        let url = self.url(&format!("/repos/-/{}/tags", name));
        let body = json!({ "tag_name": tag, "commit_id": commit_hash });

        match self.client.post_json(&url, self.headers(), &body).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_conflict() => {
                let tag_url = format!("{}/{}", url, tag);
                self.client.delete(&tag_url, self.headers()).await?;
                self.client.post_json(&url, self.headers(), &body).await?;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    commit_hash: String,
    manifest: Value,
}

#[derive(Debug, Deserialize)]
struct CreatedCommit {
    commit: CreatedCommitHash,
}

#[derive(Debug, Deserialize)]
struct CreatedCommitHash {
    commit_hash: String,
}

#[async_trait]
impl<C: HttpClientTrait> PromptHub for HttpTrackingClient<C> {
    async fn pull(&self, reference: &PromptRef) -> Result<PromptCommit, DomainError> {
        let url = self.url_with_params(
            &format!("/commits/-/{}/{}", reference.name, reference.tag),
            &[("include_model", "true".to_string())],
        )?;

        let response: CommitResponse =
            Self::parse(self.client.get_json(&url, self.headers()).await?, "commit")?;
        debug!(prompt = %reference, commit = %response.commit_hash, "Pulled prompt");

        Self::parse(response.manifest, "prompt manifest")
    }

    async fn push(
        &self,
        name: &str,
        commit: PromptCommit,
        tags: Vec<String>,
    ) -> Result<PushOutcome, DomainError> {
        self.ensure_repo(name, commit.description.as_deref()).await?;

        let manifest = serde_json::to_value(&commit)
            .map_err(|e| DomainError::internal(format!("Failed to serialize prompt: {}", e)))?;
        let body = json!({ "manifest": manifest, "parent_commit": null });
        let url = self.url(&format!("/commits/-/{}", name));

        let created: CreatedCommit = match self.client.post_json(&url, self.headers(), &body).await {
            Ok(value) => Self::parse(value, "created commit")?,
            // The service refuses to commit an unchanged manifest
            Err(e) if e.is_conflict() => return Ok(PushOutcome::Unchanged),
            Err(e) => return Err(e),
        };

        for tag in &tags {
            self.set_tag(name, tag, &created.commit.commit_hash).await?;
        }

        debug!(prompt = %name, commit = %created.commit.commit_hash, "Pushed prompt");
        Ok(PushOutcome::Created)
    }
}

#[async_trait]
impl<C: HttpClientTrait> TrackingClient for HttpTrackingClient<C> {
    async fn list_private_prompts(&self) -> Result<Vec<PromptRepo>, DomainError> {
        self.list_all(
            "/repos/",
            vec![("is_public", "false".to_string())],
            |mut page| page.get_mut("repos").map(Value::take).unwrap_or(Value::Array(vec![])),
        )
        .await
    }

    async fn delete_prompt(&self, repo_handle: &str) -> Result<(), DomainError> {
        let url = self.url(&format!("/repos/-/{}", repo_handle));
        self.client.delete(&url, self.headers()).await
    }

    async fn list_datasets(&self) -> Result<Vec<Dataset>, DomainError> {
        self.list_all("/datasets", vec![], |page| page).await
    }

    async fn create_dataset(&self, name: &str, description: &str) -> Result<Dataset, DomainError> {
        let body = json!({ "name": name, "description": description });
        let value = self
            .client
            .post_json(&self.url("/datasets"), self.headers(), &body)
            .await?;

        Self::parse(value, "dataset")
    }

    async fn delete_dataset(&self, dataset_id: &str) -> Result<(), DomainError> {
        let url = self.url(&format!("/datasets/{}", dataset_id));
        self.client.delete(&url, self.headers()).await
    }

    async fn create_examples(
        &self,
        dataset_id: &str,
        examples: Vec<GoldenExample>,
    ) -> Result<usize, DomainError> {
        let count = examples.len();
        let body: Vec<Value> = examples
            .into_iter()
            .map(|e| {
                json!({
                    "dataset_id": dataset_id,
                    "inputs": e.inputs,
                    "outputs": e.outputs,
                })
            })
            .collect();

        self.client
            .post_json(&self.url("/examples/bulk"), self.headers(), &Value::Array(body))
            .await?;
        Ok(count)
    }

    async fn list_examples(&self, dataset_name: &str) -> Result<Vec<GoldenExample>, DomainError> {
        let dataset = self.dataset_by_name(dataset_name).await?;
        self.list_all("/examples", vec![("dataset", dataset.id)], |page| page)
            .await
    }

    async fn list_annotation_queues(&self) -> Result<Vec<AnnotationQueue>, DomainError> {
        self.list_all("/annotation-queues", vec![], |page| page).await
    }

    async fn delete_annotation_queue(&self, queue_id: &str) -> Result<(), DomainError> {
        let url = self.url(&format!("/annotation-queues/{}", queue_id));
        self.client.delete(&url, self.headers()).await
    }

    async fn list_projects(&self) -> Result<Vec<TracingProject>, DomainError> {
        self.list_all("/sessions", vec![], |page| page).await
    }

    async fn delete_project(&self, project_id: &str) -> Result<(), DomainError> {
        let url = self.url(&format!("/sessions/{}", project_id));
        self.client.delete(&url, self.headers()).await
    }
}

#[async_trait]
impl<C: HttpClientTrait> RunTracer for HttpTrackingClient<C> {
    async fn post_runs(&self, runs: Vec<RunRecord>) -> Result<(), DomainError> {
        if runs.is_empty() {
            return Ok(());
        }

        let count = runs.len();
        let mut post = Vec::with_capacity(count);
        for run in runs {
            let mut value = serde_json::to_value(run)
                .map_err(|e| DomainError::internal(format!("Failed to serialize run: {}", e)))?;
            if let Some(fields) = value.as_object_mut() {
                fields.insert("session_name".to_string(), Value::String(self.project.clone()));
            }
            post.push(value);
        }

        self.client
            .post_json(&self.url("/runs/batch"), self.headers(), &json!({ "post": post }))
            .await?;
        debug!(project = %self.project, runs = count, "Posted run traces");
        Ok(())
    }
}
