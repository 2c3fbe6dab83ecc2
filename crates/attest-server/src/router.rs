use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handler::{self, AppState};

/// Build the axum router with all Attest endpoints.
pub fn build_router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/v1/health", get(handler::health_handler))
        .route("/v1/info", get(handler::info_handler))
        .route(
            "/v1/records",
            post(handler::upload_handler).get(handler::list_handler),
        )
        .route("/v1/records/:id", axum::routing::delete(handler::delete_handler))
        .route("/v1/records/:id/commit", post(handler::commit_handler))
        .route("/v1/records/:id/verify", get(handler::verify_handler))
        .route("/v1/records/:id/access", post(handler::access_handler))
        .route("/v1/records/:id/history", get(handler::history_handler))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
