use axum::{
    http::HeaderValue,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use super::chat;
use super::health;
use super::middleware::logging_middleware;
use super::state::AppState;

/// Create the router with all `/api` endpoints
pub fn create_router(state: AppState, cors_origins: &[String]) -> Router {
    let api = Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        .route("/chat", post(chat::chat))
        .route("/chat/stream", post(chat::chat_stream));

    Router::new()
        .nest("/api", api)
        .with_state(state)
        .layer(middleware::from_fn(logging_middleware))
        .layer(build_cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
}

/// Allow the configured frontend origins with credentials. Methods and
/// headers are mirrored from the preflight since wildcards cannot be combined
/// with credentials.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}
