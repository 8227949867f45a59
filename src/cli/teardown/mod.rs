//! Teardown command - deletes every resource seeded on the tracking service

use anyhow::Context;
use tracing::info;

use crate::build_services;
use crate::config::AppConfig;
use crate::domain::tracking::{with_rate_limit_retry, RetryPolicy, TrackingClient};
use crate::domain::DomainError;

/// How many resources of each kind were deleted
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TeardownReport {
    pub prompts: usize,
    pub datasets: usize,
    pub annotation_queues: usize,
    pub projects: usize,
}

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let services = build_services(&config)?;
    let tracking = services
        .tracking
        .context("LANGSMITH_API_KEY is not set; teardown needs the tracking service")?;

    let report = teardown(tracking.as_ref(), &RetryPolicy::default()).await?;
    info!(
        prompts = report.prompts,
        datasets = report.datasets,
        annotation_queues = report.annotation_queues,
        projects = report.projects,
        "Teardown complete"
    );
    Ok(())
}

pub async fn teardown(
    tracking: &dyn TrackingClient,
    policy: &RetryPolicy,
) -> Result<TeardownReport, DomainError> {
    let mut report = TeardownReport::default();

    let prompts = with_rate_limit_retry(policy, "list_prompts", || tracking.list_private_prompts()).await?;
    for prompt in prompts {
        with_rate_limit_retry(policy, "delete_prompt", || tracking.delete_prompt(&prompt.repo_handle)).await?;
        info!(prompt = %prompt.repo_handle, "Deleted prompt");
        report.prompts += 1;
    }

    let datasets = with_rate_limit_retry(policy, "list_datasets", || tracking.list_datasets()).await?;
    for dataset in datasets {
        with_rate_limit_retry(policy, "delete_dataset", || tracking.delete_dataset(&dataset.id)).await?;
        info!(dataset = %dataset.name, "Deleted dataset");
        report.datasets += 1;
    }

    let queues = with_rate_limit_retry(policy, "list_annotation_queues", || {
        tracking.list_annotation_queues()
    })
    .await?;
    for queue in queues {
        with_rate_limit_retry(policy, "delete_annotation_queue", || {
            tracking.delete_annotation_queue(&queue.id)
        })
        .await?;
        info!(queue = %queue.name, "Deleted annotation queue");
        report.annotation_queues += 1;
    }

    let projects = with_rate_limit_retry(policy, "list_projects", || tracking.list_projects()).await?;
    for project in projects {
        with_rate_limit_retry(policy, "delete_project", || tracking.delete_project(&project.id)).await?;
        info!(project = %project.name, "Deleted project");
        report.projects += 1;
    }

    Ok(report)
}
