use chrono::Utc;
use rusqlite::{params, Row};

use shiplog_core::project::{CreateProject, Project, UpdateProject};

use super::super::{not_found_or_internal, SqliteDatabase, SqliteResultExt};
use crate::DbError;

fn row_to_project(row: &Row) -> rusqlite::Result<Project> {
    let auto_generation: i32 = row.get("auto_generation")?;
    let poll_interval_secs: i64 = row.get("poll_interval_secs")?;
    Ok(Project {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        credential: row.get("credential")?,
        auto_generation: auto_generation != 0,
        poll_interval_secs: u64::try_from(poll_interval_secs).unwrap_or_default(),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn interval_to_sql(secs: u64) -> i64 {
    i64::try_from(secs).unwrap_or(i64::MAX)
}

impl SqliteDatabase {
    pub fn create_project_sync(&self, input: &CreateProject) -> Result<Project, DbError> {
        self.with_conn(|conn| {
            let id = uuid::Uuid::new_v4().to_string();
            let now = Utc::now();
            conn.execute(
                "INSERT INTO projects
                    (id, name, description, credential, auto_generation, poll_interval_secs, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    id,
                    input.name,
                    input.description,
                    input.credential,
                    input.auto_generation as i32,
                    interval_to_sql(input.interval_or_default()),
                    now,
                    now
                ],
            )
            .to_db()?;
            conn.query_row(
                "SELECT * FROM projects WHERE id = ?1",
                params![id],
                row_to_project,
            )
            .to_db()
        })
    }

    pub fn get_project_sync(&self, id: &str) -> Result<Project, DbError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT * FROM projects WHERE id = ?1",
                params![id],
                row_to_project,
            )
            .map_err(|e| not_found_or_internal(e, format!("project {id}")))
        })
    }

    pub fn list_projects_sync(&self) -> Result<Vec<Project>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT * FROM projects ORDER BY name")
                .to_db()?;
            let projects = stmt
                .query_map([], row_to_project)
                .to_db()?
                .collect::<Result<Vec<_>, _>>()
                .to_db()?;
            Ok(projects)
        })
    }

    pub fn update_project_sync(
        &self,
        id: &str,
        update: &UpdateProject,
    ) -> Result<Project, DbError> {
        self.with_conn(|conn| {
            let mut sets = Vec::new();
            let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

            if let Some(ref name) = update.name {
                sets.push("name = ?");
                values.push(Box::new(name.clone()));
            }
            if let Some(ref description) = update.description {
                sets.push("description = ?");
                values.push(Box::new(description.clone()));
            }
            if let Some(ref credential) = update.credential {
                sets.push("credential = ?");
                values.push(Box::new(credential.clone()));
            }
            if let Some(auto_generation) = update.auto_generation {
                sets.push("auto_generation = ?");
                values.push(Box::new(auto_generation as i32));
            }
            if let Some(secs) = update.poll_interval_secs {
                sets.push("poll_interval_secs = ?");
                values.push(Box::new(interval_to_sql(secs)));
            }

            if !sets.is_empty() {
                sets.push("updated_at = ?");
                values.push(Box::new(Utc::now()));
                values.push(Box::new(id.to_string()));

                let sql = format!("UPDATE projects SET {} WHERE id = ?", sets.join(", "));
                let params: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
                let changed = conn.execute(&sql, params.as_slice()).to_db()?;
                if changed == 0 {
                    return Err(DbError::NotFound(format!("project {id}")));
                }
            }

            conn.query_row(
                "SELECT * FROM projects WHERE id = ?1",
                params![id],
                row_to_project,
            )
            .map_err(|e| not_found_or_internal(e, format!("project {id}")))
        })
    }
}
