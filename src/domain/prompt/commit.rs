//! Versioned prompts as stored in a prompt hub

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ChatPromptTemplate;
use crate::domain::DomainError;

/// Tag used when a reference names no tag
pub const LATEST_TAG: &str = "latest";

/// Reference to a prompt in a hub: `name` or `name:tag`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRef {
    pub name: String,
    pub tag: String,
}

impl PromptRef {
    pub fn new(name: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tag: tag.into(),
        }
    }

    pub fn latest(name: impl Into<String>) -> Self {
        Self::new(name, LATEST_TAG)
    }
}

impl FromStr for PromptRef {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, tag) = match s.split_once(':') {
            Some((name, tag)) => (name.trim(), tag.trim()),
            None => (s.trim(), LATEST_TAG),
        };

        if name.is_empty() || tag.is_empty() {
            return Err(DomainError::validation(format!(
                "Invalid prompt reference '{}'",
                s
            )));
        }

        Ok(Self::new(name, tag))
    }
}

impl fmt::Display for PromptRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.tag)
    }
}

/// Model settings stored alongside a prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptModel {
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl PromptModel {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// A prompt template plus its optional model settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptCommit {
    pub template: ChatPromptTemplate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<PromptModel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl PromptCommit {
    pub fn new(template: ChatPromptTemplate) -> Self {
        Self {
            template,
            model: None,
            description: None,
        }
    }

    pub fn with_model(mut self, model: PromptModel) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Model name and temperature to generate with, falling back to the
    /// given model at temperature 0 when the commit carries no settings
    pub fn model_or(&self, fallback_model: &str) -> PromptModel {
        match &self.model {
            Some(model) => PromptModel {
                model: model.model.clone(),
                temperature: Some(model.temperature.unwrap_or(0.0)),
            },
            None => PromptModel::new(fallback_model).with_temperature(0.0),
        }
    }
}
