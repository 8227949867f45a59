//! Application configuration

mod app_config;

pub use app_config::{
    AppConfig, EvaluationConfig, IngestConfig, LlmConfig, LogFormat, LoggingConfig, PromptConfig,
    RagSettings, ServerConfig, TrackingConfig, VectorStoreConfig,
};
