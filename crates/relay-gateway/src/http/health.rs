use axum::{extract::State, Json};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;

/// GET /health: liveness probe. Returns server metadata.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "commit": env!("RELAY_GIT_SHA"),
        "worker_connected": state.relay.is_connected(),
        "buffered_tasks": state.relay.buffered_tasks(),
        "uptime_secs": (Utc::now() - state.started_at).num_seconds(),
    }))
}
