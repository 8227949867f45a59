//! Experiment-tracking service domain - datasets, prompts, queues, projects, run traces

mod client;
mod retry;
mod run;

pub use client::{AnnotationQueue, Dataset, PromptRepo, TracingProject, TrackingClient};
pub use retry::{with_rate_limit_retry, RetryPolicy};
pub use run::{RunRecord, RunTrace, RunTracer, RunType};

#[cfg(test)]
pub use client::MockTrackingClient;
#[cfg(test)]
pub use run::MockRunTracer;
