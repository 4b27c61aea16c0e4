use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use super::{db_error, ApiResult, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/projects/{id}/notifications", get(list_notifications))
        .route("/api/notifications/{id}/read", post(mark_read))
}

async fn list_notifications(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> ApiResult<Json<Value>> {
    state.db.get_project(&project_id).await.map_err(db_error)?;
    state
        .db
        .list_notifications(&project_id)
        .await
        .map(|n| Json(json!(n)))
        .map_err(db_error)
}

async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    state
        .db
        .mark_notification_read(id)
        .await
        .map(|n| Json(json!(n)))
        .map_err(db_error)
}
