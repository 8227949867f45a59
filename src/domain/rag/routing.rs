//! Deciding between the document-listing tool and retrieval

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::llm::{LlmResponse, Message, ToolCall, ToolDefinition};
use crate::domain::vector_store::DocumentMetadata;

pub const LIST_DOCUMENTS_TOOL: &str = "list_documents";

const LIST_DOCUMENTS_DESCRIPTION: &str =
    "List all available documents in the NovaPay knowledge base, organized by category.";

const DEFAULT_CATEGORY: &str = "General";

pub const ROUTE_SYSTEM_PROMPT: &str = "You are a routing assistant for NovaPay documentation. \
You have access to a `list_documents` tool that lists every document in the knowledge base. \
ONLY call the tool when the user EXPLICITLY asks to list, browse, or see all available documents \
(e.g. 'what documents do you have?', 'show me available docs', 'list all topics'). \
Do NOT call the tool for ambiguous, short, or follow-up messages like 'yes', 'tell me more', \
'go on', 'thanks', etc. For EVERYTHING else, including follow-ups, clarifications, and content \
questions, reply with the single word RAG.";

pub const TOOL_RESULT_SYSTEM_PROMPT: &str = "Present the tool results to the user in a helpful way.";

pub fn list_documents_tool() -> ToolDefinition {
    ToolDefinition::new(LIST_DOCUMENTS_TOOL, LIST_DOCUMENTS_DESCRIPTION)
}

/// Outcome of the routing call
#[derive(Debug, Clone, PartialEq)]
pub enum RouteDecision {
    /// Answer with the tool; keeps the assistant message that requested it
    Tool {
        call: ToolCall,
        assistant: Message,
    },
    Rag,
}

impl RouteDecision {
    /// Any tool call selects the tool path. Only the first call is executed,
    /// so the replayed assistant message carries just that call.
    pub fn from_response(response: &LlmResponse) -> Self {
        match response.tool_calls().first() {
            Some(call) => Self::Tool {
                call: call.clone(),
                assistant: Message::assistant_tool_calls(response.content(), vec![call.clone()]),
            },
            None => Self::Rag,
        }
    }
}

/// Markdown listing of every source grouped by category
pub fn render_document_listing(metadata: &[DocumentMetadata]) -> String {
    let mut categories: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();

    for meta in metadata {
        let category = meta.category.as_deref().unwrap_or(DEFAULT_CATEGORY);
        categories
            .entry(category)
            .or_default()
            .insert(meta.source_or_unknown());
    }

    let mut lines = vec!["**Available NovaPay Documentation:**\n".to_string()];
    for (category, sources) in categories {
        lines.push(format!("### {}", category));
        lines.extend(sources.into_iter().map(|source| format!("- {}", source)));
        lines.push(String::new());
    }

    lines.join("\n")
}
