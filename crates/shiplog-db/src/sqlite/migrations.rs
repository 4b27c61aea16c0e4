use rusqlite::Connection;

use super::SqliteResultExt;
use crate::DbError;

pub fn run(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS projects (
            id                 TEXT PRIMARY KEY,
            name               TEXT NOT NULL,
            description        TEXT NOT NULL DEFAULT '',
            credential         TEXT NOT NULL DEFAULT '',
            auto_generation    INTEGER NOT NULL DEFAULT 1,
            poll_interval_secs INTEGER NOT NULL DEFAULT 300,
            created_at         TEXT NOT NULL,
            updated_at         TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS repositories (
            id             TEXT PRIMARY KEY,
            project_id     TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
            owner          TEXT NOT NULL,
            name           TEXT NOT NULL,
            url            TEXT NOT NULL,
            last_watermark TEXT,
            created_at     TEXT NOT NULL
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_repositories_project_full_name
            ON repositories(project_id, owner, name);

        -- seq gives insertion order; history is read newest first by seq.
        CREATE TABLE IF NOT EXISTS changelog_entries (
            seq                INTEGER PRIMARY KEY AUTOINCREMENT,
            repository_id      TEXT NOT NULL REFERENCES repositories(id) ON DELETE CASCADE,
            version            TEXT NOT NULL,
            generated_at       TEXT NOT NULL,
            lines              TEXT NOT NULL DEFAULT '[]',
            change_request_ids TEXT NOT NULL DEFAULT '[]'
        );
        CREATE INDEX IF NOT EXISTS idx_changelog_repository
            ON changelog_entries(repository_id, seq);

        CREATE TABLE IF NOT EXISTS notifications (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
            kind       TEXT NOT NULL
                           CHECK(kind IN ('success', 'error', 'info', 'warning')),
            title      TEXT NOT NULL,
            message    TEXT NOT NULL,
            failure    TEXT,
            created_at TEXT NOT NULL,
            read       INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_notifications_project
            ON notifications(project_id, id);
        ",
    )
    .to_db()?;
    Ok(())
}
