//! RAG domain - chat events, citations, context formatting and routing

mod context;
mod event;
mod metadata;
mod routing;

pub use context::{extract_sources, format_context, SNIPPET_CHARS};
pub use event::{ChatEvent, ChatResponse, SourceCitation};
pub use metadata::ChatMetadata;
pub use routing::{
    list_documents_tool, render_document_listing, RouteDecision, LIST_DOCUMENTS_TOOL,
    ROUTE_SYSTEM_PROMPT, TOOL_RESULT_SYSTEM_PROMPT,
};
