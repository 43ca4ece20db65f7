//! SQLite-backed store via libsql. Implements CycleStore.
//!
//! One database file (data/newsletter.db) shared by all groups. Schemas, cycles and
//! answers are stored as JSON columns; (group_id, cycle_number, responder_id) is the
//! primary key of `responses`, so a duplicate insert is caught by the database too.

use crate::domain::{CompiledNewsletter, DomainError, QuestionSchema, ReleaseCycle, Response};
use crate::ports::CycleStore;
use chrono::{DateTime, Utc};
use libsql::{Database, params};
use std::path::{Path, PathBuf};
use tracing::info;

const SCHEMAS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schemas (
    group_id TEXT PRIMARY KEY,
    questions_json TEXT NOT NULL
)"#;

const CYCLES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS cycles (
    group_id TEXT PRIMARY KEY,
    cycle_number INTEGER NOT NULL,
    state TEXT NOT NULL,
    cycle_json TEXT NOT NULL
)"#;

const RESPONSES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS responses (
    group_id TEXT NOT NULL,
    cycle_number INTEGER NOT NULL,
    responder_id TEXT NOT NULL,
    answers_json TEXT NOT NULL,
    submitted_at_ns INTEGER NOT NULL,
    PRIMARY KEY (group_id, cycle_number, responder_id)
)"#;

const NEWSLETTERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS newsletters (
    group_id TEXT NOT NULL,
    cycle_number INTEGER NOT NULL,
    title TEXT NOT NULL,
    body TEXT NOT NULL,
    location TEXT,
    generated_at_ns INTEGER NOT NULL,
    PRIMARY KEY (group_id, cycle_number)
)"#;

const UPSERT_CYCLE: &str = r#"
INSERT INTO cycles (group_id, cycle_number, state, cycle_json)
VALUES (?1, ?2, ?3, ?4)
ON CONFLICT (group_id) DO UPDATE SET
    cycle_number = excluded.cycle_number,
    state = excluded.state,
    cycle_json = excluded.cycle_json
"#;

fn repo_err(e: impl std::fmt::Display) -> DomainError {
    DomainError::store(e.to_string())
}

/// SQLite store. Safe to share via Arc.
pub struct SqliteStore {
    db: Database,
    db_path: PathBuf,
}

impl SqliteStore {
    /// Connect to (or create) the database in `base_dir` and ensure the schema exists.
    /// Sets WAL mode and synchronous=NORMAL.
    pub async fn connect(base_dir: impl AsRef<Path>) -> Result<Self, DomainError> {
        let base = base_dir.as_ref();
        std::fs::create_dir_all(base).map_err(repo_err)?;
        let db_path = base.join("newsletter.db");
        let path_str = db_path.to_string_lossy();
        let db = libsql::Builder::new_local(path_str.as_ref())
            .build()
            .await
            .map_err(repo_err)?;
        let conn = db.connect().map_err(repo_err)?;

        // PRAGMA returns a row; use query and drain it (execute fails when rows are returned).
        for pragma in ["PRAGMA journal_mode=WAL", "PRAGMA synchronous=NORMAL"] {
            let mut rows = conn
                .query(pragma, ())
                .await
                .map_err(|e| DomainError::store(format!("{} failed: {}", pragma, e)))?;
            while rows.next().await.map_err(repo_err)?.is_some() {}
        }

        for table in [SCHEMAS_TABLE, CYCLES_TABLE, RESPONSES_TABLE, NEWSLETTERS_TABLE] {
            conn.execute(table, ()).await.map_err(repo_err)?;
        }

        info!(path = %db_path.display(), "SQLite store connected with WAL mode");

        Ok(Self { db, db_path })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn conn(&self) -> Result<libsql::Connection, DomainError> {
        self.db.connect().map_err(repo_err)
    }

    fn cycle_params(cycle: &ReleaseCycle) -> Result<(String, i64, String, String), DomainError> {
        Ok((
            cycle.group_id.clone(),
            i64::from(cycle.cycle_number),
            cycle.state.to_string(),
            serde_json::to_string(cycle).map_err(repo_err)?,
        ))
    }
}

/// Nanoseconds since the epoch; exact for 1677..2262.
fn timestamp(at: DateTime<Utc>) -> Result<i64, DomainError> {
    at.timestamp_nanos_opt()
        .ok_or_else(|| DomainError::store(format!("timestamp out of range: {}", at)))
}

fn from_timestamp(nanos: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_nanos(nanos)
}

#[async_trait::async_trait]
impl CycleStore for SqliteStore {
    async fn load_schema(&self, group_id: &str) -> Result<QuestionSchema, DomainError> {
        let conn = self.conn()?;
        let mut rows = conn
            .query(
                "SELECT questions_json FROM schemas WHERE group_id = ?1",
                params![group_id],
            )
            .await
            .map_err(repo_err)?;
        match rows.next().await.map_err(repo_err)? {
            Some(row) => {
                let json: String = row.get(0).map_err(repo_err)?;
                serde_json::from_str(&json).map_err(repo_err)
            }
            None => Ok(QuestionSchema::default()),
        }
    }

    async fn save_schema(
        &self,
        group_id: &str,
        schema: &QuestionSchema,
    ) -> Result<(), DomainError> {
        let json = serde_json::to_string(schema).map_err(repo_err)?;
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO schemas (group_id, questions_json)
            VALUES (?1, ?2)
            ON CONFLICT (group_id) DO UPDATE SET
                questions_json = excluded.questions_json
            "#,
            params![group_id, json],
        )
        .await
        .map_err(repo_err)?;
        Ok(())
    }

    async fn load_cycle(&self, group_id: &str) -> Result<Option<ReleaseCycle>, DomainError> {
        let conn = self.conn()?;
        let mut rows = conn
            .query(
                "SELECT cycle_json FROM cycles WHERE group_id = ?1",
                params![group_id],
            )
            .await
            .map_err(repo_err)?;
        match rows.next().await.map_err(repo_err)? {
            Some(row) => {
                let json: String = row.get(0).map_err(repo_err)?;
                Ok(Some(serde_json::from_str(&json).map_err(repo_err)?))
            }
            None => Ok(None),
        }
    }

    async fn save_cycle(&self, cycle: &ReleaseCycle) -> Result<(), DomainError> {
        let (group_id, number, state, json) = Self::cycle_params(cycle)?;
        let conn = self.conn()?;
        conn.execute(UPSERT_CYCLE, params![group_id, number, state, json])
            .await
            .map_err(repo_err)?;
        Ok(())
    }

    async fn load_responses(
        &self,
        group_id: &str,
        cycle_number: u32,
    ) -> Result<Vec<Response>, DomainError> {
        let conn = self.conn()?;
        let mut rows = conn
            .query(
                r#"
                SELECT responder_id, answers_json, submitted_at_ns
                FROM responses
                WHERE group_id = ?1 AND cycle_number = ?2
                ORDER BY submitted_at_ns ASC, rowid ASC
                "#,
                params![group_id, i64::from(cycle_number)],
            )
            .await
            .map_err(repo_err)?;
        let mut responses = Vec::new();
        while let Some(row) = rows.next().await.map_err(repo_err)? {
            let responder_id: String = row.get(0).map_err(repo_err)?;
            let answers_json: String = row.get(1).map_err(repo_err)?;
            let submitted_at: i64 = row.get(2).map_err(repo_err)?;
            responses.push(Response {
                responder_id,
                group_id: group_id.to_string(),
                cycle_number,
                answers: serde_json::from_str(&answers_json).map_err(repo_err)?,
                submitted_at: from_timestamp(submitted_at),
            });
        }
        Ok(responses)
    }

    async fn commit_submission(
        &self,
        cycle: &ReleaseCycle,
        response: &Response,
    ) -> Result<(), DomainError> {
        let answers_json = serde_json::to_string(&response.answers).map_err(repo_err)?;
        let submitted_at = timestamp(response.submitted_at)?;
        let (group_id, number, state, cycle_json) = Self::cycle_params(cycle)?;
        let conn = self.conn()?;
        let tx = conn.transaction().await.map_err(repo_err)?;
        let inserted = tx
            .execute(
                r#"
                INSERT INTO responses (group_id, cycle_number, responder_id, answers_json, submitted_at_ns)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT (group_id, cycle_number, responder_id) DO NOTHING
                "#,
                params![
                    response.group_id.as_str(),
                    i64::from(response.cycle_number),
                    response.responder_id.as_str(),
                    answers_json,
                    submitted_at
                ],
            )
            .await
            .map_err(repo_err)?;
        if inserted == 0 {
            tx.rollback().await.map_err(repo_err)?;
            return Err(DomainError::DuplicateSubmission(
                response.responder_id.clone(),
            ));
        }
        tx.execute(UPSERT_CYCLE, params![group_id, number, state, cycle_json])
            .await
            .map_err(repo_err)?;
        tx.commit().await.map_err(repo_err)?;
        Ok(())
    }

    async fn commit_release(
        &self,
        cycle: &ReleaseCycle,
        newsletter: &CompiledNewsletter,
    ) -> Result<(), DomainError> {
        let generated_at = timestamp(newsletter.generated_at)?;
        let (group_id, number, state, cycle_json) = Self::cycle_params(cycle)?;
        let conn = self.conn()?;
        let tx = conn.transaction().await.map_err(repo_err)?;
        tx.execute(
            r#"
            INSERT INTO newsletters (group_id, cycle_number, title, body, location, generated_at_ns)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                newsletter.group_id.as_str(),
                i64::from(newsletter.cycle_number),
                newsletter.title.as_str(),
                newsletter.body.as_str(),
                newsletter.location.clone(),
                generated_at
            ],
        )
        .await
        .map_err(repo_err)?;
        tx.execute(UPSERT_CYCLE, params![group_id, number, state, cycle_json])
            .await
            .map_err(repo_err)?;
        tx.commit().await.map_err(repo_err)?;
        Ok(())
    }

    async fn load_newsletters(
        &self,
        group_id: &str,
    ) -> Result<Vec<CompiledNewsletter>, DomainError> {
        let conn = self.conn()?;
        let mut rows = conn
            .query(
                r#"
                SELECT cycle_number, title, body, location, generated_at_ns
                FROM newsletters
                WHERE group_id = ?1
                ORDER BY cycle_number ASC
                "#,
                params![group_id],
            )
            .await
            .map_err(repo_err)?;
        let mut newsletters = Vec::new();
        while let Some(row) = rows.next().await.map_err(repo_err)? {
            let cycle_number: i64 = row.get(0).map_err(repo_err)?;
            let generated_at: i64 = row.get(4).map_err(repo_err)?;
            newsletters.push(CompiledNewsletter {
                group_id: group_id.to_string(),
                cycle_number: u32::try_from(cycle_number).map_err(repo_err)?,
                title: row.get(1).map_err(repo_err)?,
                body: row.get(2).map_err(repo_err)?,
                location: row.get::<String>(3).ok(),
                generated_at: from_timestamp(generated_at),
            });
        }
        Ok(newsletters)
    }
}
