//! Chat endpoints

use std::convert::Infallible;

use axum::{
    extract::State,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
};
use futures::StreamExt;
use tracing::{info, warn};

use crate::api::state::AppState;
use crate::api::types::{ApiError, ChatRequest, ChatResponse, Json};
use crate::domain::rag::ChatEvent;

const EMPTY_QUESTION: &str = "Question cannot be empty";

/// POST /api/chat
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let question = request
        .validated_question()
        .ok_or_else(|| ApiError::bad_request(EMPTY_QUESTION))?;

    info!(
        thread_id = request.metadata.session_id().unwrap_or("-"),
        question_chars = question.chars().count(),
        "Processing chat request"
    );

    let response = state.pipeline.query(question, &request.metadata).await?;
    Ok(Json(response))
}

/// POST /api/chat/stream - one `data:` line per chat event, ending with `done`
pub async fn chat_stream(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    if request.validated_question().is_none() {
        return Err(ApiError::bad_request(EMPTY_QUESTION));
    }

    info!(
        thread_id = request.metadata.session_id().unwrap_or("-"),
        "Processing streaming chat request"
    );

    let events = state
        .pipeline
        .stream(request.question, request.metadata)
        .map(|event| Ok::<_, Infallible>(to_sse_event(&event)));

    Ok(Sse::new(events)
        .keep_alive(KeepAlive::default())
        .into_response())
}

fn to_sse_event(event: &ChatEvent) -> Event {
    match serde_json::to_string(event) {
        Ok(data) => Event::default().data(data),
        Err(e) => {
            warn!(error = %e, "Failed to serialize chat event");
            Event::default().data(r#"{"type":"error","content":"Internal server error"}"#)
        }
    }
}
