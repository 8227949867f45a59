//! Tracking service client trait

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[cfg(test)]
use mockall::automock;

use crate::domain::evaluation::GoldenExample;
use crate::domain::DomainError;

/// A prompt repository owned by the workspace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptRepo {
    pub repo_handle: String,
    #[serde(default)]
    pub is_public: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationQueue {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TracingProject {
    pub id: String,
    pub name: String,
}

/// Resource management on the experiment-tracking service
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TrackingClient: Send + Sync {
    async fn list_private_prompts(&self) -> Result<Vec<PromptRepo>, DomainError>;

    async fn delete_prompt(&self, repo_handle: &str) -> Result<(), DomainError>;

    async fn list_datasets(&self) -> Result<Vec<Dataset>, DomainError>;

    /// Fails with a conflict error when a dataset with this name exists
    async fn create_dataset(&self, name: &str, description: &str) -> Result<Dataset, DomainError>;

    async fn delete_dataset(&self, dataset_id: &str) -> Result<(), DomainError>;

    async fn create_examples(
        &self,
        dataset_id: &str,
        examples: Vec<GoldenExample>,
    ) -> Result<usize, DomainError>;

    /// Examples of the dataset with the given name
    async fn list_examples(&self, dataset_name: &str) -> Result<Vec<GoldenExample>, DomainError>;

    async fn list_annotation_queues(&self) -> Result<Vec<AnnotationQueue>, DomainError>;

    async fn delete_annotation_queue(&self, queue_id: &str) -> Result<(), DomainError>;

    async fn list_projects(&self) -> Result<Vec<TracingProject>, DomainError>;

    async fn delete_project(&self, project_id: &str) -> Result<(), DomainError>;
}
