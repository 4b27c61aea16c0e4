use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

use shiplog_core::changelog::ChangelogEntry;
use shiplog_core::repository::ConnectedRepository;

use super::super::{not_found_or_internal, SqliteDatabase, SqliteResultExt};
use super::repositories::row_to_repository;
use crate::DbError;

fn json_column_err(idx: usize, e: serde_json::Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

fn row_to_entry(row: &Row) -> rusqlite::Result<ChangelogEntry> {
    let lines: String = row.get("lines")?;
    let ids: String = row.get("change_request_ids")?;
    let lines: Vec<String> = serde_json::from_str(&lines).map_err(|e| json_column_err(3, e))?;
    let change_request_ids: BTreeSet<u64> =
        serde_json::from_str(&ids).map_err(|e| json_column_err(4, e))?;
    Ok(ChangelogEntry {
        version: row.get("version")?,
        generated_at: row.get("generated_at")?,
        lines,
        change_request_ids,
    })
}

impl SqliteDatabase {
    pub fn list_changelog_sync(&self, repository_id: &str) -> Result<Vec<ChangelogEntry>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT * FROM changelog_entries WHERE repository_id = ?1 ORDER BY seq DESC",
                )
                .to_db()?;
            let entries = stmt
                .query_map(params![repository_id], row_to_entry)
                .to_db()?
                .collect::<Result<Vec<_>, _>>()
                .to_db()?;
            Ok(entries)
        })
    }

    pub fn append_changelog_sync(
        &self,
        repository_id: &str,
        entry: &ChangelogEntry,
        watermark: DateTime<Utc>,
    ) -> Result<ConnectedRepository, DbError> {
        let lines = serde_json::to_string(&entry.lines)
            .map_err(|e| DbError::Internal(format!("encode lines: {e}")))?;
        let ids = serde_json::to_string(&entry.change_request_ids)
            .map_err(|e| DbError::Internal(format!("encode change request ids: {e}")))?;

        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction().to_db()?;

            let current: Option<DateTime<Utc>> = tx
                .query_row(
                    "SELECT last_watermark FROM repositories WHERE id = ?1",
                    params![repository_id],
                    |row| row.get(0),
                )
                .map_err(|e| not_found_or_internal(e, format!("repository {repository_id}")))?;

            tx.execute(
                "INSERT INTO changelog_entries (repository_id, version, generated_at, lines, change_request_ids)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![repository_id, entry.version, entry.generated_at, lines, ids],
            )
            .to_db()?;

            // The watermark never moves backwards.
            let next = current.map_or(watermark, |c| c.max(watermark));
            tx.execute(
                "UPDATE repositories SET last_watermark = ?1 WHERE id = ?2",
                params![next, repository_id],
            )
            .to_db()?;

            let repo = tx
                .query_row(
                    "SELECT * FROM repositories WHERE id = ?1",
                    params![repository_id],
                    row_to_repository,
                )
                .to_db()?;
            tx.commit().to_db()?;
            Ok(repo)
        })
    }
}
