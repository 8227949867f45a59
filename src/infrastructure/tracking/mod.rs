//! Experiment-tracking service client

mod http;

pub use http::{HttpTrackingClient, DEFAULT_TRACKING_URL};
