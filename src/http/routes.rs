use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Specialists
        .route("/api/specialists", get(handlers::list_specialists))
        .route("/api/suggest-doctors", post(handlers::suggest_doctors))
        // Session records
        .route(
            "/api/session-chart",
            post(handlers::create_session_chart).get(handlers::get_session_chart),
        )
        // Live consultation control
        .route(
            "/api/sessions/:session_id/connect",
            post(handlers::connect_session),
        )
        .route(
            "/api/sessions/:session_id/disconnect",
            post(handlers::disconnect_session),
        )
        .route(
            "/api/sessions/:session_id/status",
            get(handlers::get_session_status),
        )
        .route(
            "/api/sessions/:session_id/transcript",
            get(handlers::get_session_transcript),
        )
        .layer(CorsLayer::permissive())
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
