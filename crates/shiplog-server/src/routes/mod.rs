pub mod changelogs;
pub mod health;
pub mod monitors;
pub mod notifications;
pub mod projects;
pub mod repositories;

use std::sync::Arc;

use axum::{http::StatusCode, Json, Router};
use serde_json::{json, Value};
use shiplog_core::CoreError;
use shiplog_db::{Database, DbError};
use shiplog_monitor::{FetchError, MonitorError, TaskRegistry};

pub struct InnerAppState {
    pub db: Arc<dyn Database>,
    pub registry: Arc<TaskRegistry>,
}

pub type AppState = Arc<InnerAppState>;

pub type ApiError = (StatusCode, Json<Value>);
pub type ApiResult<T> = Result<T, ApiError>;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(projects::routes())
        .merge(repositories::routes())
        .merge(changelogs::routes())
        .merge(monitors::routes())
        .merge(notifications::routes())
        .with_state(state)
}

fn error_body(status: StatusCode, msg: String) -> ApiError {
    (status, Json(json!({ "error": msg })))
}

pub(crate) fn db_error(e: DbError) -> ApiError {
    let status = match &e {
        DbError::NotFound(_) => StatusCode::NOT_FOUND,
        DbError::Conflict(_) => StatusCode::CONFLICT,
        DbError::Io(_) | DbError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_body(status, e.to_string())
}

pub(crate) fn core_error(e: CoreError) -> ApiError {
    let status = match &e {
        CoreError::NotFound(_) => StatusCode::NOT_FOUND,
        CoreError::InvalidInput(_) => StatusCode::BAD_REQUEST,
    };
    error_body(status, e.to_string())
}

pub(crate) fn monitor_error(e: MonitorError) -> ApiError {
    let status = match &e {
        MonitorError::InvalidInput(_) | MonitorError::Fetch(FetchError::InvalidInput(_)) => {
            StatusCode::BAD_REQUEST
        }
        MonitorError::NotFound(_) => StatusCode::NOT_FOUND,
        MonitorError::Fetch(FetchError::RateLimited(_) | FetchError::Transient(_)) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        MonitorError::Fetch(FetchError::Unauthorized(_) | FetchError::MalformedResponse(_)) => {
            StatusCode::BAD_GATEWAY
        }
        MonitorError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(json!({
            "error": e.to_string(),
            "failure": e.failure_kind().as_str(),
        })),
    )
}

pub(crate) fn bad_request(msg: impl Into<String>) -> ApiError {
    error_body(StatusCode::BAD_REQUEST, msg.into())
}
