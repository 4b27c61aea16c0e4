use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use shiplog_core::MonitorConfig;

use super::{db_error, monitor_error, ApiResult, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct StartMonitor {
    /// Overrides the project's `poll_interval_secs`.
    pub interval_secs: Option<u64>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/monitors", get(list_monitors))
        .route("/api/projects/{id}/monitor/start", post(start_monitor))
        .route("/api/projects/{id}/monitor/stop", post(stop_monitor))
}

async fn list_monitors(State(state): State<AppState>) -> Json<Value> {
    Json(json!(state.registry.status()))
}

async fn start_monitor(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<StartMonitor>>,
) -> ApiResult<Json<Value>> {
    let input = body.map(|Json(b)| b).unwrap_or_default();
    let interval_secs = match input.interval_secs {
        Some(secs) => secs,
        None => {
            let project = state.db.get_project(&id).await.map_err(db_error)?;
            project.poll_interval_secs
        }
    };

    state
        .registry
        .start(&id, MonitorConfig::new(interval_secs))
        .await
        .map_err(monitor_error)?;
    let monitor = state.registry.status().remove(&id);
    Ok(Json(json!({ "status": "started", "monitor": monitor })))
}

async fn stop_monitor(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<Value> {
    let stopped = state.registry.stop(&id).await;
    Json(json!({ "stopped": stopped }))
}
