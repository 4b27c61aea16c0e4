pub(crate) mod migrations;
pub mod queries;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::debug;

use shiplog_core::changelog::ChangelogEntry;
use shiplog_core::notification::{NewNotification, Notification};
use shiplog_core::project::{CreateProject, Project, UpdateProject};
use shiplog_core::repository::{ConnectRepository, ConnectedRepository};

use crate::{Database, DbConfig, DbError};

/// Extension trait that converts `rusqlite::Result<T>` into `Result<T, DbError>`.
pub(crate) trait SqliteResultExt<T> {
    fn to_db(self) -> Result<T, DbError>;
}

impl<T> SqliteResultExt<T> for rusqlite::Result<T> {
    fn to_db(self) -> Result<T, DbError> {
        self.map_err(map_sqlite_err)
    }
}

/// Map a `rusqlite::Error` into a `DbError::Internal`.
pub(crate) fn map_sqlite_err(e: rusqlite::Error) -> DbError {
    DbError::Internal(e.to_string())
}

/// Like `to_db`, but a missing row becomes `NotFound(what)`.
pub(crate) fn not_found_or_internal(e: rusqlite::Error, what: String) -> DbError {
    match e {
        rusqlite::Error::QueryReturnedNoRows => DbError::NotFound(what),
        other => map_sqlite_err(other),
    }
}

#[derive(Clone)]
pub struct SqliteDatabase {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDatabase {
    pub fn open(config: &DbConfig) -> Result<Self, DbError> {
        let path = config
            .sqlite_path
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(|| crate::data_dir().join("shiplog.db"));
        std::fs::create_dir_all(path.parent().unwrap_or(Path::new(".")))?;
        Self::open_path(&path)
    }

    pub fn open_path(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path).to_db()?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA foreign_keys=ON;
             PRAGMA busy_timeout=5000;",
        )
        .to_db()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        debug!("opened sqlite database at {}", path.display());
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory().to_db()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;").to_db()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    pub(crate) fn with_conn<F, T>(&self, f: F) -> Result<T, DbError>
    where
        F: FnOnce(&Connection) -> Result<T, DbError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|_| DbError::Internal("lock poisoned".into()))?;
        f(&conn)
    }

    fn run_migrations(&self) -> Result<(), DbError> {
        self.with_conn(migrations::run)
    }

    /// Run a synchronous query on the blocking pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T, DbError>
    where
        F: FnOnce(&SqliteDatabase) -> Result<T, DbError> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| DbError::Internal(e.to_string()))?
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    // -- Projects --
    async fn create_project(&self, input: &CreateProject) -> Result<Project, DbError> {
        let input = input.clone();
        self.blocking(move |db| db.create_project_sync(&input)).await
    }
    async fn get_project(&self, id: &str) -> Result<Project, DbError> {
        let id = id.to_string();
        self.blocking(move |db| db.get_project_sync(&id)).await
    }
    async fn list_projects(&self) -> Result<Vec<Project>, DbError> {
        self.blocking(|db| db.list_projects_sync()).await
    }
    async fn update_project(&self, id: &str, update: &UpdateProject) -> Result<Project, DbError> {
        let id = id.to_string();
        let update = update.clone();
        self.blocking(move |db| db.update_project_sync(&id, &update))
            .await
    }

    // -- Repositories --
    async fn connect_repository(
        &self,
        input: &ConnectRepository,
    ) -> Result<ConnectedRepository, DbError> {
        let input = input.clone();
        self.blocking(move |db| db.connect_repository_sync(&input))
            .await
    }
    async fn get_repository(&self, id: &str) -> Result<ConnectedRepository, DbError> {
        let id = id.to_string();
        self.blocking(move |db| db.get_repository_sync(&id)).await
    }
    async fn list_repositories(
        &self,
        project_id: &str,
    ) -> Result<Vec<ConnectedRepository>, DbError> {
        let project_id = project_id.to_string();
        self.blocking(move |db| db.list_repositories_sync(&project_id))
            .await
    }

    // -- Changelog --
    async fn list_changelog(&self, repository_id: &str) -> Result<Vec<ChangelogEntry>, DbError> {
        let repository_id = repository_id.to_string();
        self.blocking(move |db| db.list_changelog_sync(&repository_id))
            .await
    }
    async fn append_changelog(
        &self,
        repository_id: &str,
        entry: &ChangelogEntry,
        watermark: DateTime<Utc>,
    ) -> Result<ConnectedRepository, DbError> {
        let repository_id = repository_id.to_string();
        let entry = entry.clone();
        self.blocking(move |db| db.append_changelog_sync(&repository_id, &entry, watermark))
            .await
    }

    // -- Notifications --
    async fn create_notification(&self, input: &NewNotification) -> Result<Notification, DbError> {
        let input = input.clone();
        self.blocking(move |db| db.create_notification_sync(&input))
            .await
    }
    async fn list_notifications(&self, project_id: &str) -> Result<Vec<Notification>, DbError> {
        let project_id = project_id.to_string();
        self.blocking(move |db| db.list_notifications_sync(&project_id))
            .await
    }
    async fn mark_notification_read(&self, id: i64) -> Result<Notification, DbError> {
        self.blocking(move |db| db.mark_notification_read_sync(id))
            .await
    }
}
