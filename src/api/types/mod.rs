//! Request, response and error types of the HTTP API

pub mod chat;
pub mod error;
pub mod json;

pub use chat::{ChatRequest, ChatResponse, SourceCitation};
pub use error::{ApiError, ApiErrorResponse, INTERNAL_ERROR_DETAIL};
pub use json::Json;
