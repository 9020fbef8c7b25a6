pub mod health;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::analysis::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/analyses",
            get(handlers::handle_list_analyses).post(handlers::handle_create_analysis),
        )
        .route("/api/v1/analyses/validate", post(handlers::handle_validate))
        .route("/api/v1/analyses/normalize", post(handlers::handle_normalize))
        .route(
            "/api/v1/analyses/:id",
            get(handlers::handle_get_analysis).delete(handlers::handle_delete_analysis),
        )
        .route(
            "/api/v1/analyses/:id/confidence",
            patch(handlers::handle_update_confidence).put(handlers::handle_replace_confidence),
        )
        .with_state(state)
}
