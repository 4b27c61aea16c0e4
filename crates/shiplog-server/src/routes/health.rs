use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use super::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/health", get(health))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let monitors = state.registry.status();
    let running = monitors.values().filter(|m| m.running).count();
    Json(json!({
        "status": "ok",
        "monitors": monitors.len(),
        "running": running,
    }))
}
