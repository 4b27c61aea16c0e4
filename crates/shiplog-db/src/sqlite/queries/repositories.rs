use chrono::Utc;
use rusqlite::{params, Row};

use shiplog_core::repository::{ConnectRepository, ConnectedRepository};

use super::super::{not_found_or_internal, SqliteDatabase, SqliteResultExt};
use crate::DbError;

pub(crate) fn row_to_repository(row: &Row) -> rusqlite::Result<ConnectedRepository> {
    Ok(ConnectedRepository {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        owner: row.get("owner")?,
        name: row.get("name")?,
        url: row.get("url")?,
        last_watermark: row.get("last_watermark")?,
        created_at: row.get("created_at")?,
    })
}

impl SqliteDatabase {
    pub fn connect_repository_sync(
        &self,
        input: &ConnectRepository,
    ) -> Result<ConnectedRepository, DbError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id FROM projects WHERE id = ?1",
                params![input.project_id],
                |row| row.get::<_, String>(0),
            )
            .map_err(|e| not_found_or_internal(e, format!("project {}", input.project_id)))?;

            let existing: i64 = conn
                .query_row(
                    "SELECT count(*) FROM repositories
                     WHERE project_id = ?1 AND owner = ?2 AND name = ?3",
                    params![input.project_id, input.owner, input.name],
                    |row| row.get(0),
                )
                .to_db()?;
            if existing > 0 {
                return Err(DbError::Conflict(format!(
                    "repository {}/{} already connected",
                    input.owner, input.name
                )));
            }

            let id = uuid::Uuid::new_v4().to_string();
            conn.execute(
                "INSERT INTO repositories (id, project_id, owner, name, url, last_watermark, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6)",
                params![
                    id,
                    input.project_id,
                    input.owner,
                    input.name,
                    input.url,
                    Utc::now()
                ],
            )
            .to_db()?;
            conn.query_row(
                "SELECT * FROM repositories WHERE id = ?1",
                params![id],
                row_to_repository,
            )
            .to_db()
        })
    }

    pub fn get_repository_sync(&self, id: &str) -> Result<ConnectedRepository, DbError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT * FROM repositories WHERE id = ?1",
                params![id],
                row_to_repository,
            )
            .map_err(|e| not_found_or_internal(e, format!("repository {id}")))
        })
    }

    pub fn list_repositories_sync(
        &self,
        project_id: &str,
    ) -> Result<Vec<ConnectedRepository>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT * FROM repositories WHERE project_id = ?1 ORDER BY created_at, owner, name",
                )
                .to_db()?;
            let repos = stmt
                .query_map(params![project_id], row_to_repository)
                .to_db()?
                .collect::<Result<Vec<_>, _>>()
                .to_db()?;
            Ok(repos)
        })
    }
}
