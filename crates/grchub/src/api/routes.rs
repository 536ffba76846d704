//! API route definitions.

use axum::http::{HeaderValue, Method, header};
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, warn};

use super::chat;
use super::handlers;
use super::state::AppState;

/// Create the API router. The caller nests it under `/api`.
pub fn create_router(state: AppState, cors_origins: &[String]) -> Router {
    let cors = build_cors_layer(cors_origins);

    // Tracing layer with request spans and timing
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .route("/health", get(handlers::health))
        // Knowledge base (read-only)
        .route("/knowledge", get(handlers::list_knowledge))
        .route("/knowledge/search", get(handlers::search_knowledge))
        .route("/knowledge/stats", get(handlers::knowledge_stats))
        .route("/knowledge/{id}", get(handlers::get_knowledge_entry))
        // Streaming chat gateway
        .route("/chat", post(chat::chat))
        .layer(cors)
        .layer(trace_layer)
        .with_state(state)
}

/// Build the CORS layer: permissive when no origins are configured (local
/// development), otherwise restricted to the configured list.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE]);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(parsed))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}
