use std::path::PathBuf;

use serde::Deserialize;

/// Well-known environment variables and the keys they override
const ENV_OVERRIDES: [(&str, &str); 10] = [
    ("LLM_MODEL", "llm.model"),
    ("EMBEDDING_MODEL", "llm.embedding_model"),
    ("OPENAI_API_KEY", "llm.api_key"),
    ("OPENAI_BASE_URL", "llm.base_url"),
    ("VECTOR_STORE_DIR", "vector_store.persist_dir"),
    ("PROMPT_NAME", "prompt.name"),
    ("PROMPT_TAG", "prompt.tag"),
    ("LANGSMITH_ENDPOINT", "tracking.api_url"),
    ("LANGSMITH_API_KEY", "tracking.api_key"),
    ("LANGSMITH_PROJECT", "tracking.project"),
];

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub llm: LlmConfig,
    pub vector_store: VectorStoreConfig,
    pub rag: RagSettings,
    pub prompt: PromptConfig,
    pub tracking: TrackingConfig,
    pub ingest: IngestConfig,
    pub evaluation: EvaluationConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Frontend origins allowed by CORS
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub embedding_model: String,
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VectorStoreConfig {
    pub persist_dir: PathBuf,
    pub collection: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub retriever_k: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    pub name: String,
    pub tag: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub api_url: String,
    /// Without a key prompts are served from the built-in local hub
    pub api_key: Option<String>,
    pub project: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub docs_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub dataset_name: String,
    pub dataset_path: PathBuf,
    pub judge_model: String,
    /// Answers sampled per question when building reference answers
    pub samples: usize,
    pub results_dir: PathBuf,
    pub concurrency: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            api_key: None,
            base_url: "https://api.openai.com".to_string(),
            timeout_secs: 120,
        }
    }
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            persist_dir: PathBuf::from("vector_store"),
            collection: "novapay_docs".to_string(),
        }
    }
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            retriever_k: 4,
        }
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            name: "novapay-qa-prompt".to_string(),
            tag: "prod".to_string(),
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.smith.langchain.com".to_string(),
            api_key: None,
            project: "novapay-docs-qa".to_string(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            docs_dir: PathBuf::from("docs"),
        }
    }
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            dataset_name: "novapay-qa-golden".to_string(),
            dataset_path: PathBuf::from("evaluation/golden_dataset.json"),
            judge_model: "gpt-4o".to_string(),
            samples: 4,
            results_dir: PathBuf::from("evaluation/results"),
            concurrency: 4,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_with(|name| std::env::var(name).ok())
    }

    /// Layered load: config files, `APP__*` variables, then the well-known
    /// variables resolved through `env`
    pub fn load_with<F>(env: F) -> Result<Self, config::ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            );

        for (var, key) in ENV_OVERRIDES {
            let value = env(var).filter(|v| !v.trim().is_empty());
            builder = builder.set_override_option(key, value)?;
        }

        builder.build()?.try_deserialize()
    }
}
