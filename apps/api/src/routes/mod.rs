pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::state::AppState;
use crate::tailoring::handlers;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/llm/ping", get(handlers::handle_llm_ping))
        // Tailoring API
        .route("/api/v1/resumes/snapshot", post(handlers::handle_snapshot))
        .route("/api/v1/resumes/tailor", post(handlers::handle_tailor))
        .layer(DefaultBodyLimit::max(upload_limit))
        .with_state(state)
}
