mod sqlite;

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use shiplog_core::changelog::ChangelogEntry;
use shiplog_core::notification::{NewNotification, Notification};
use shiplog_core::project::{CreateProject, Project, UpdateProject};
use shiplog_core::repository::{ConnectRepository, ConnectedRepository};

pub use sqlite::SqliteDatabase;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone, Default)]
pub struct DbConfig {
    /// Path of the SQLite file. Defaults to `<data dir>/shiplog.db`.
    pub sqlite_path: Option<String>,
}

/// `$XDG_DATA_HOME/shiplog`, falling back to `~/.local/share/shiplog`.
pub fn data_dir() -> PathBuf {
    let base = if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        PathBuf::from(xdg)
    } else if let Some(home) = std::env::var_os("HOME") {
        PathBuf::from(home).join(".local/share")
    } else {
        PathBuf::from(".")
    };
    base.join("shiplog")
}

/// Persistence collaborator for projects, connected repositories, their
/// changelog history and the notification log.
///
/// The monitor only relies on two things being atomic: reading a
/// repository's history, and `append_changelog` (entry + watermark).
#[async_trait]
pub trait Database: Send + Sync {
    // -- Projects --
    async fn create_project(&self, input: &CreateProject) -> Result<Project, DbError>;
    async fn get_project(&self, id: &str) -> Result<Project, DbError>;
    async fn list_projects(&self) -> Result<Vec<Project>, DbError>;
    async fn update_project(&self, id: &str, update: &UpdateProject) -> Result<Project, DbError>;

    // -- Repositories --
    async fn connect_repository(
        &self,
        input: &ConnectRepository,
    ) -> Result<ConnectedRepository, DbError>;
    async fn get_repository(&self, id: &str) -> Result<ConnectedRepository, DbError>;
    async fn list_repositories(&self, project_id: &str)
        -> Result<Vec<ConnectedRepository>, DbError>;

    // -- Changelog --
    /// History of one repository, newest entry first.
    async fn list_changelog(&self, repository_id: &str) -> Result<Vec<ChangelogEntry>, DbError>;
    /// Prepend `entry` to the repository's history and move its watermark
    /// forward to `watermark`, in one transaction. Returns the updated record.
    async fn append_changelog(
        &self,
        repository_id: &str,
        entry: &ChangelogEntry,
        watermark: DateTime<Utc>,
    ) -> Result<ConnectedRepository, DbError>;

    // -- Notifications --
    async fn create_notification(&self, input: &NewNotification) -> Result<Notification, DbError>;
    /// Notifications of one project, newest first.
    async fn list_notifications(&self, project_id: &str) -> Result<Vec<Notification>, DbError>;
    async fn mark_notification_read(&self, id: i64) -> Result<Notification, DbError>;
}
