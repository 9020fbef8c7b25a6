use axum::{extract::State, Json};
use serde_json::{json, Value};
use tracing::warn;

use crate::analysis::history::load_history;
use crate::state::AppState;

/// GET /health
/// Service version plus a readability check of the history store.
/// Reports "degraded" when the store cannot be read or entries were skipped.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let backend = match state.config.database_url {
        Some(_) => "postgres",
        None => "json-file",
    };
    let history = match load_history(state.store.as_ref()).await {
        Ok(history) => history,
        Err(e) => {
            warn!("Health check could not read history: {e:#}");
            return Json(json!({
                "status": "degraded",
                "version": env!("CARGO_PKG_VERSION"),
                "service": "readiness-api",
                "store": backend,
                "history": { "readable": false }
            }));
        }
    };

    let status = if history.has_data_loss() { "degraded" } else { "ok" };
    Json(json!({
        "status": status,
        "version": env!("CARGO_PKG_VERSION"),
        "service": "readiness-api",
        "store": backend,
        "history": {
            "readable": true,
            "rawCount": history.raw_count,
            "validCount": history.valid_count
        }
    }))
}
