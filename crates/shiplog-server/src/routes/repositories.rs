use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use shiplog_core::repository::ConnectRepository;
use shiplog_core::RepoRef;
use tracing::info;

use super::{core_error, db_error, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct ConnectRequest {
    pub repo_url: String,
}

pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/api/projects/{id}/repositories",
        get(list_repositories).post(connect_repository),
    )
}

async fn list_repositories(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> ApiResult<Json<Value>> {
    state.db.get_project(&project_id).await.map_err(db_error)?;
    state
        .db
        .list_repositories(&project_id)
        .await
        .map(|r| Json(json!(r)))
        .map_err(db_error)
}

async fn connect_repository(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Json(input): Json<ConnectRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let repo = RepoRef::parse_url(&input.repo_url).map_err(core_error)?;
    let connected = state
        .db
        .connect_repository(&ConnectRepository::new(&project_id, &repo))
        .await
        .map_err(db_error)?;
    info!("connected {repo} to project {project_id}");
    Ok((StatusCode::CREATED, Json(json!(connected))))
}
