use super::handlers;
use super::state::AppState;
use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Capture modal
        .route("/capture/open", post(handlers::open_capture))
        .route(
            "/capture/:session_id/switch",
            post(handlers::switch_camera),
        )
        .route(
            "/capture/:session_id/record/start",
            post(handlers::start_recording),
        )
        .route(
            "/capture/:session_id/record/stop",
            post(handlers::stop_recording),
        )
        .route(
            "/capture/:session_id/accept",
            post(handlers::accept_recording),
        )
        .route(
            "/capture/:session_id/discard",
            post(handlers::discard_recording),
        )
        .route("/capture/:session_id/close", post(handlers::close_capture))
        .route(
            "/capture/:session_id/status",
            get(handlers::get_capture_status),
        )
        // Sell form
        .route("/form/videos", get(handlers::list_videos))
        .route("/form/videos/:index", delete(handlers::remove_video))
        .route("/form/submit", post(handlers::submit_sell_form))
        // Browsing
        .route("/machines/:kind", get(handlers::list_machines))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
