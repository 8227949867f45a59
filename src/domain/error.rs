use thiserror::Error;

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("{message}")]
    VectorStoreNotFound { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Provider error: {provider} - {message}")]
    Provider { provider: String, message: String },

    #[error("Rate limited by {provider}: {message}")]
    RateLimited { provider: String, message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Template error: {message}")]
    Template { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// The vector store directory is missing; ingestion has not been run yet.
    pub fn vector_store_not_found(path: impl std::fmt::Display) -> Self {
        Self::VectorStoreNotFound {
            message: format!(
                "Vector store not found at {}. Run `novapay-docs-qa ingest` first to ingest documents.",
                path
            ),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn rate_limited(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RateLimited {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn template(message: impl Into<String>) -> Self {
        Self::Template {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let error = DomainError::not_found("Prompt 'novapay-qa-prompt:prod' not found");
        assert_eq!(
            error.to_string(),
            "Not found: Prompt 'novapay-qa-prompt:prod' not found"
        );
    }

    #[test]
    fn test_vector_store_not_found_message() {
        let error = DomainError::vector_store_not_found("/data/vector_store");
        assert_eq!(
            error.to_string(),
            "Vector store not found at /data/vector_store. Run `novapay-docs-qa ingest` first to ingest documents."
        );
    }

    #[test]
    fn test_rate_limited_predicate() {
        assert!(DomainError::rate_limited("tracking", "slow down").is_rate_limited());
        assert!(!DomainError::internal("boom").is_rate_limited());
    }

    #[test]
    fn test_conflict_error() {
        let error = DomainError::conflict("Dataset already exists");
        assert_eq!(error.to_string(), "Conflict: Dataset already exists");
        assert!(error.is_conflict());
    }
}
