use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use super::{db_error, monitor_error, ApiResult, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/repositories/{id}/changelog", get(list_changelog))
        .route("/api/repositories/{id}/changelog.md", get(changelog_markdown))
        .route(
            "/api/projects/{id}/repositories/{repo_id}/generate",
            post(generate_now),
        )
}

async fn list_changelog(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    state.db.get_repository(&id).await.map_err(db_error)?;
    state
        .db
        .list_changelog(&id)
        .await
        .map(|entries| Json(json!(entries)))
        .map_err(db_error)
}

async fn changelog_markdown(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let repo = state.db.get_repository(&id).await.map_err(db_error)?;
    let entries = state.db.list_changelog(&id).await.map_err(db_error)?;

    let mut doc = format!("# Changelog for {}\n", repo.full_name());
    for entry in &entries {
        doc.push('\n');
        doc.push_str(&entry.to_markdown());
    }
    Ok(([(header::CONTENT_TYPE, "text/markdown; charset=utf-8")], doc))
}

async fn generate_now(
    State(state): State<AppState>,
    Path((project_id, repo_id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    state
        .registry
        .generate_now(&project_id, &repo_id)
        .await
        .map(|outcome| Json(json!(outcome)))
        .map_err(monitor_error)
}
