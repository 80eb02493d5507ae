//! SQLite-backed [`QuestionStore`].

use super::types::{flatten_question_set, QuestionKind, StoredQuestion, Upload, UploadStatus};
use super::QuestionStore;
use crate::error::StoreError;
use crate::model::{Difficulty, QuestionSet};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS uploads (
    upload_id     TEXT PRIMARY KEY,
    filename      TEXT NOT NULL,
    source_key    TEXT,
    status        TEXT NOT NULL,
    topic         TEXT,
    error_message TEXT,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS questions (
    seq             INTEGER PRIMARY KEY AUTOINCREMENT,
    question_id     TEXT NOT NULL UNIQUE,
    upload_id       TEXT NOT NULL REFERENCES uploads(upload_id),
    type            TEXT NOT NULL,
    topic           TEXT NOT NULL,
    question        TEXT NOT NULL,
    options         TEXT,
    correct_answer  TEXT,
    explanation     TEXT,
    expected_points TEXT,
    difficulty      TEXT,
    filename        TEXT NOT NULL,
    created_at      TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_questions_upload ON questions(upload_id);
";

const UPLOAD_COLUMNS: &str =
    "upload_id, filename, source_key, status, topic, error_message, created_at, updated_at";

const QUESTION_COLUMNS: &str = "question_id, upload_id, type, topic, question, options, \
     correct_answer, explanation, expected_points, difficulty, filename, created_at";

/// SQLite-backed store. One connection, serialised by a mutex.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and ensure the schema exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::init(Connection::open(path)?)
    }

    /// A private database that disappears with the store.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

impl QuestionStore for SqliteStore {
    fn save_upload(
        &self,
        upload_id: &str,
        filename: &str,
        source_key: Option<&str>,
    ) -> Result<Upload, StoreError> {
        let upload = Upload::new(upload_id, filename, source_key.map(str::to_string));
        let inserted = self.conn()?.execute(
            "INSERT INTO uploads
             (upload_id, filename, source_key, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                upload.upload_id,
                upload.filename,
                upload.source_key,
                upload.status.as_str(),
                upload.created_at,
                upload.updated_at,
            ],
        );
        match inserted {
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                return Err(StoreError::UploadExists {
                    upload_id: upload_id.to_string(),
                })
            }
            other => other?,
        };
        debug!("Saved upload {upload_id}");
        Ok(upload)
    }

    fn update_upload_status(
        &self,
        upload_id: &str,
        status: UploadStatus,
        topic: Option<&str>,
        error: Option<&str>,
    ) -> Result<(), StoreError> {
        let changed = self.conn()?.execute(
            "UPDATE uploads
             SET status = ?1,
                 topic = COALESCE(?2, topic),
                 error_message = COALESCE(?3, error_message),
                 updated_at = ?4
             WHERE upload_id = ?5",
            params![status.as_str(), topic, error, Utc::now(), upload_id],
        )?;
        if changed == 0 {
            return Err(StoreError::UploadNotFound {
                upload_id: upload_id.to_string(),
            });
        }
        debug!("Upload {upload_id} → {status}");
        Ok(())
    }

    fn save_questions(
        &self,
        upload_id: &str,
        filename: &str,
        set: &QuestionSet,
    ) -> Result<Vec<StoredQuestion>, StoreError> {
        let rows = flatten_question_set(upload_id, filename, set);
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;
        insert_questions(&tx, &rows)?;
        tx.commit()?;
        debug!("Saved {} questions for upload {upload_id}", rows.len());
        Ok(rows)
    }

    fn complete_upload(
        &self,
        upload_id: &str,
        filename: &str,
        set: &QuestionSet,
    ) -> Result<Vec<StoredQuestion>, StoreError> {
        let rows = flatten_question_set(upload_id, filename, set);
        let conn = self.conn()?;
        // Dropping the transaction on any early return rolls it back.
        let tx = conn.unchecked_transaction()?;
        let changed = tx.execute(
            "UPDATE uploads SET status = ?1, topic = ?2, updated_at = ?3 WHERE upload_id = ?4",
            params![UploadStatus::Completed.as_str(), set.topic, Utc::now(), upload_id],
        )?;
        if changed == 0 {
            return Err(StoreError::UploadNotFound {
                upload_id: upload_id.to_string(),
            });
        }
        insert_questions(&tx, &rows)?;
        tx.commit()?;
        debug!("Upload {upload_id} completed with {} questions", rows.len());
        Ok(rows)
    }

    fn get_questions_by_upload(&self, upload_id: &str) -> Result<Vec<StoredQuestion>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE upload_id = ?1 ORDER BY seq"
        ))?;
        let rows = stmt.query_map(params![upload_id], question_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn get_upload(&self, upload_id: &str) -> Result<Option<Upload>, StoreError> {
        let conn = self.conn()?;
        let upload = conn
            .query_row(
                &format!("SELECT {UPLOAD_COLUMNS} FROM uploads WHERE upload_id = ?1"),
                params![upload_id],
                upload_from_row,
            )
            .optional()?;
        Ok(upload)
    }

    fn list_uploads(&self, limit: usize) -> Result<Vec<Upload>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {UPLOAD_COLUMNS} FROM uploads
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?1"
        ))?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![limit], upload_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

// ── Row mapping ──────────────────────────────────────────────────────────────

fn insert_questions(conn: &Connection, rows: &[StoredQuestion]) -> Result<(), StoreError> {
    let mut stmt = conn.prepare(&format!(
        "INSERT INTO questions ({QUESTION_COLUMNS})
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
    ))?;
    for q in rows {
        let options = list_json(&q.options, q.kind == QuestionKind::Mcq)?;
        let points = list_json(&q.expected_points, q.kind == QuestionKind::Short)?;
        stmt.execute(params![
            q.question_id,
            q.upload_id,
            q.kind.as_str(),
            q.topic,
            q.question,
            options,
            q.correct_answer,
            q.explanation,
            points,
            q.difficulty.map(Difficulty::as_str),
            q.filename,
            q.created_at,
        ])?;
    }
    Ok(())
}

/// JSON for a list column, or NULL when the column does not apply.
fn list_json(items: &[String], applies: bool) -> Result<Option<String>, StoreError> {
    if applies {
        Ok(Some(serde_json::to_string(items)?))
    } else {
        Ok(None)
    }
}

fn parse_list(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<String>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(json) => serde_json::from_str(&json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))),
        None => Ok(Vec::new()),
    }
}

fn parse_text<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
}

fn upload_from_row(row: &Row<'_>) -> rusqlite::Result<Upload> {
    Ok(Upload {
        upload_id: row.get(0)?,
        filename: row.get(1)?,
        source_key: row.get(2)?,
        status: parse_text(row, 3)?,
        topic: row.get(4)?,
        error_message: row.get(5)?,
        created_at: row.get::<_, DateTime<Utc>>(6)?,
        updated_at: row.get::<_, DateTime<Utc>>(7)?,
    })
}

fn question_from_row(row: &Row<'_>) -> rusqlite::Result<StoredQuestion> {
    let difficulty: Option<String> = row.get(9)?;
    Ok(StoredQuestion {
        question_id: row.get(0)?,
        upload_id: row.get(1)?,
        kind: parse_text(row, 2)?,
        topic: row.get(3)?,
        question: row.get(4)?,
        options: parse_list(row, 5)?,
        correct_answer: row.get(6)?,
        explanation: row.get(7)?,
        expected_points: parse_list(row, 8)?,
        difficulty: difficulty.as_deref().map(|d| Difficulty::parse(d).unwrap_or_default()),
        filename: row.get(10)?,
        created_at: row.get::<_, DateTime<Utc>>(11)?,
    })
}
