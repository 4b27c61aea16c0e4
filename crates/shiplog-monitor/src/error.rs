use shiplog_core::{CoreError, FailureKind};
use shiplog_db::DbError;
use thiserror::Error;

use crate::repo_client::FetchError;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("database error: {0}")]
    Database(String),
}

impl MonitorError {
    /// Failure class recorded on error notifications.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            MonitorError::InvalidInput(_) | MonitorError::NotFound(_) => FailureKind::InvalidInput,
            MonitorError::Fetch(e) => e.kind(),
            MonitorError::Database(_) => FailureKind::Transient,
        }
    }
}

impl From<DbError> for MonitorError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound(what) => MonitorError::NotFound(what),
            DbError::Conflict(what) => MonitorError::InvalidInput(what),
            other => MonitorError::Database(other.to_string()),
        }
    }
}

impl From<CoreError> for MonitorError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::NotFound(what) => MonitorError::NotFound(what),
            CoreError::InvalidInput(what) => MonitorError::InvalidInput(what),
        }
    }
}
