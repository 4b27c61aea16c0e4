use rusqlite::{params, Row};

use shiplog_core::notification::{FailureKind, NewNotification, Notification, NotificationKind};

use super::super::{not_found_or_internal, SqliteDatabase, SqliteResultExt};
use crate::DbError;

fn row_to_notification(row: &Row) -> rusqlite::Result<Notification> {
    let kind: String = row.get("kind")?;
    let failure: Option<String> = row.get("failure")?;
    let read: i32 = row.get("read")?;
    Ok(Notification {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        kind: NotificationKind::parse_str(&kind).unwrap_or(NotificationKind::Info),
        title: row.get("title")?,
        message: row.get("message")?,
        failure: failure.as_deref().and_then(FailureKind::parse_str),
        created_at: row.get("created_at")?,
        read: read != 0,
    })
}

impl SqliteDatabase {
    pub fn create_notification_sync(
        &self,
        input: &NewNotification,
    ) -> Result<Notification, DbError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO notifications (project_id, kind, title, message, failure, created_at, read)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0)",
                params![
                    input.project_id,
                    input.kind.as_str(),
                    input.title,
                    input.message,
                    input.failure.map(|f| f.as_str()),
                    input.created_at
                ],
            )
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(ref err, _)
                    if err.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    DbError::NotFound(format!("project {}", input.project_id))
                }
                other => DbError::Internal(other.to_string()),
            })?;
            let id = conn.last_insert_rowid();
            conn.query_row(
                "SELECT * FROM notifications WHERE id = ?1",
                params![id],
                row_to_notification,
            )
            .to_db()
        })
    }

    pub fn list_notifications_sync(&self, project_id: &str) -> Result<Vec<Notification>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT * FROM notifications WHERE project_id = ?1 ORDER BY id DESC")
                .to_db()?;
            let notifications = stmt
                .query_map(params![project_id], row_to_notification)
                .to_db()?
                .collect::<Result<Vec<_>, _>>()
                .to_db()?;
            Ok(notifications)
        })
    }

    pub fn mark_notification_read_sync(&self, id: i64) -> Result<Notification, DbError> {
        self.with_conn(|conn| {
            let changed = conn
                .execute("UPDATE notifications SET read = 1 WHERE id = ?1", params![id])
                .to_db()?;
            if changed == 0 {
                return Err(DbError::NotFound(format!("notification {id}")));
            }
            conn.query_row(
                "SELECT * FROM notifications WHERE id = ?1",
                params![id],
                row_to_notification,
            )
            .map_err(|e| not_found_or_internal(e, format!("notification {id}")))
        })
    }
}
