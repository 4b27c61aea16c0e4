use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use shiplog_core::project::{CreateProject, UpdateProject};
use shiplog_core::MonitorConfig;
use tracing::warn;

use super::{bad_request, db_error, ApiResult, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/projects", get(list_projects).post(create_project))
        .route("/api/projects/{id}", get(get_project).put(update_project))
}

fn check_interval(state: &AppState, interval_secs: Option<u64>) -> ApiResult<()> {
    let Some(secs) = interval_secs else {
        return Ok(());
    };
    let min = state.registry.min_interval_secs();
    if secs < min {
        return Err(bad_request(format!(
            "poll_interval_secs must be at least {min}"
        )));
    }
    Ok(())
}

async fn list_projects(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    state
        .db
        .list_projects()
        .await
        .map(|p| Json(json!(p)))
        .map_err(db_error)
}

async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    state
        .db
        .get_project(&id)
        .await
        .map(|p| Json(json!(p)))
        .map_err(db_error)
}

async fn create_project(
    State(state): State<AppState>,
    Json(input): Json<CreateProject>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    if input.name.trim().is_empty() {
        return Err(bad_request("project name cannot be empty"));
    }
    check_interval(&state, input.poll_interval_secs)?;
    state
        .db
        .create_project(&input)
        .await
        .map(|p| (StatusCode::CREATED, Json(json!(p))))
        .map_err(db_error)
}

async fn update_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateProject>,
) -> ApiResult<Json<Value>> {
    if input.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(bad_request("project name cannot be empty"));
    }
    check_interval(&state, input.poll_interval_secs)?;
    let project = state
        .db
        .update_project(&id, &input)
        .await
        .map_err(db_error)?;

    // A running monitor picks up a new interval by being restarted.
    if input.poll_interval_secs.is_some() {
        let config = MonitorConfig::new(project.poll_interval_secs);
        if let Err(e) = state.registry.restart_if_running(&project.id, config).await {
            warn!("could not restart monitor for project {}: {e}", project.id);
        }
    }
    Ok(Json(json!(project)))
}
