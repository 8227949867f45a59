//! Prompt template parsing and rendering
//!
//! Variables use single-brace syntax: `{question}`. Literal braces are written
//! doubled (`{{` and `}}`). Rendering is a single pass, so substituted values
//! are never scanned for further variables.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::llm::{Message, MessageRole};
use crate::domain::DomainError;

static VARIABLE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{|\}\}|\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid variable pattern")
});

/// Template processing errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TemplateError {
    #[error("Missing required variable: {name}")]
    MissingVariable { name: String },

    #[error("Missing required message placeholder: {name}")]
    MissingPlaceholder { name: String },
}

impl From<TemplateError> for DomainError {
    fn from(error: TemplateError) -> Self {
        DomainError::template(error.to_string())
    }
}

/// A single string template with `{variable}` slots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct PromptTemplate {
    content: String,
    variables: Vec<String>,
}

impl PromptTemplate {
    pub fn parse(content: impl Into<String>) -> Self {
        let content = content.into();
        let mut seen = HashSet::new();
        let variables = VARIABLE_PATTERN
            .captures_iter(&content)
            .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
            .filter(|name| seen.insert(name.clone()))
            .collect();

        Self { content, variables }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Variable names in order of first appearance
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn render(&self, values: &HashMap<String, String>) -> Result<String, TemplateError> {
        if let Some(missing) = self.variables.iter().find(|v| !values.contains_key(*v)) {
            return Err(TemplateError::MissingVariable {
                name: missing.clone(),
            });
        }

        let rendered = VARIABLE_PATTERN.replace_all(&self.content, |cap: &Captures<'_>| {
            match cap.get(1) {
                Some(name) => values
                    .get(name.as_str())
                    .cloned()
                    .unwrap_or_default(),
                None if &cap[0] == "{{" => "{".to_string(),
                None => "}".to_string(),
            }
        });

        Ok(rendered.into_owned())
    }
}

impl From<String> for PromptTemplate {
    fn from(content: String) -> Self {
        Self::parse(content)
    }
}

impl From<PromptTemplate> for String {
    fn from(template: PromptTemplate) -> Self {
        template.content
    }
}

/// One entry of a chat prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PromptMessage {
    /// A message whose content is rendered from a template
    Template {
        role: MessageRole,
        template: PromptTemplate,
    },
    /// A slot filled with a list of messages, such as chat history
    Placeholder {
        name: String,
        #[serde(default)]
        optional: bool,
    },
}

/// Values used to render a [`ChatPromptTemplate`]
#[derive(Debug, Clone, Default)]
pub struct PromptValues {
    variables: HashMap<String, String>,
    placeholders: HashMap<String, Vec<Message>>,
}

impl PromptValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn messages(mut self, name: impl Into<String>, messages: Vec<Message>) -> Self {
        self.placeholders.insert(name.into(), messages);
        self
    }
}

/// An ordered list of templated messages and placeholders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatPromptTemplate {
    pub messages: Vec<PromptMessage>,
}

impl ChatPromptTemplate {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
        }
    }

    pub fn with_message(mut self, role: MessageRole, template: impl Into<String>) -> Self {
        self.messages.push(PromptMessage::Template {
            role,
            template: PromptTemplate::parse(template),
        });
        self
    }

    pub fn with_placeholder(mut self, name: impl Into<String>, optional: bool) -> Self {
        self.messages.push(PromptMessage::Placeholder {
            name: name.into(),
            optional,
        });
        self
    }

    /// Every template variable used by the prompt
    pub fn input_variables(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.messages
            .iter()
            .filter_map(|m| match m {
                PromptMessage::Template { template, .. } => Some(template.variables()),
                PromptMessage::Placeholder { .. } => None,
            })
            .flatten()
            .map(String::as_str)
            .filter(|name| seen.insert(*name))
            .collect()
    }

    pub fn format_messages(&self, values: &PromptValues) -> Result<Vec<Message>, TemplateError> {
        let mut rendered = Vec::with_capacity(self.messages.len());

        for message in &self.messages {
            match message {
                PromptMessage::Template { role, template } => {
                    let content = template.render(&values.variables)?;
                    rendered.push(Message {
                        role: *role,
                        content,
                        tool_calls: Vec::new(),
                        tool_call_id: None,
                    });
                }
                PromptMessage::Placeholder { name, optional } => {
                    match values.placeholders.get(name) {
                        Some(messages) => rendered.extend(messages.iter().cloned()),
                        None if *optional => {}
                        None => {
                            return Err(TemplateError::MissingPlaceholder { name: name.clone() });
                        }
                    }
                }
            }
        }

        Ok(rendered)
    }
}

impl Default for ChatPromptTemplate {
    fn default() -> Self {
        Self::new()
    }
}
