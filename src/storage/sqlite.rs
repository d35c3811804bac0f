//! SQLite-backed checkpoint store.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use super::{CheckpointMutation, CheckpointStore, SessionSummary, SharedDatabase, encode};
use crate::types::{Result, ResultExt, ScribeError, SessionId};
use crate::workflow::{SessionCheckpoint, SessionStatus, Stage};

/// Durable store; survives process restarts
pub struct SqliteStore {
    db: SharedDatabase,
}

impl SqliteStore {
    pub fn new(db: SharedDatabase) -> Self {
        Self { db }
    }

    fn upsert(conn: &Connection, checkpoint: &SessionCheckpoint) -> Result<()> {
        let (json, checksum) = encode(checkpoint)?;
        conn.execute(
            "INSERT INTO sessions
                 (id, topic, stage, status, revision, checkpoint_data, checksum, last_error, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(id) DO UPDATE SET
                 stage = excluded.stage,
                 status = excluded.status,
                 revision = excluded.revision,
                 checkpoint_data = excluded.checkpoint_data,
                 checksum = excluded.checksum,
                 last_error = excluded.last_error,
                 updated_at = excluded.updated_at",
            params![
                checkpoint.session_id.as_str(),
                checkpoint.state.topic,
                checkpoint.stage.as_str(),
                checkpoint.status.as_str(),
                checkpoint.revision as i64,
                json,
                checksum as i64,
                checkpoint.last_error,
                checkpoint.created_at.to_rfc3339(),
                checkpoint.updated_at.to_rfc3339(),
            ],
        )
        .with_context("Failed to write checkpoint")?;
        Ok(())
    }

    fn select(conn: &Connection, id: &SessionId) -> Result<SessionCheckpoint> {
        let data: Option<String> = conn
            .query_row(
                "SELECT checkpoint_data FROM sessions WHERE id = ?1",
                params![id.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        let data = data.ok_or_else(|| ScribeError::SessionNotFound(id.to_string()))?;
        Ok(SessionCheckpoint::from_json(&data)?)
    }
}

impl CheckpointStore for SqliteStore {
    fn create(&self, checkpoint: &SessionCheckpoint) -> Result<()> {
        self.db.transaction(|conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM sessions WHERE id = ?1)",
                params![checkpoint.session_id.as_str()],
                |row| row.get(0),
            )?;
            if exists {
                return Err(ScribeError::protocol(format!(
                    "session {} already exists",
                    checkpoint.session_id
                )));
            }
            Self::upsert(conn, checkpoint)
        })
    }

    fn save(&self, checkpoint: &SessionCheckpoint) -> Result<()> {
        self.db.transaction(|conn| Self::upsert(conn, checkpoint))
    }

    fn load(&self, id: &SessionId) -> Result<SessionCheckpoint> {
        let conn = self.db.connection()?;
        Self::select(&conn, id)
    }

    fn update(&self, id: &SessionId, mutate: CheckpointMutation<'_>) -> Result<SessionCheckpoint> {
        self.db.transaction(|conn| {
            let mut checkpoint = Self::select(conn, id)?;
            mutate(&mut checkpoint)?;
            checkpoint.touch();
            Self::upsert(conn, &checkpoint)?;
            Ok(checkpoint)
        })
    }

    fn delete(&self, id: &SessionId) -> Result<bool> {
        let removed = self.db.transaction(|conn| {
            conn.execute("DELETE FROM sessions WHERE id = ?1", params![id.as_str()])
                .with_context("Failed to delete session")
        })?;
        Ok(removed > 0)
    }

    fn list(&self) -> Result<Vec<SessionSummary>> {
        let conn = self.db.connection()?;
        let mut stmt = conn.prepare(
            "SELECT id, topic, stage, status, revision, last_error, updated_at
             FROM sessions ORDER BY updated_at DESC",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, topic, stage, status, revision, last_error, updated_at)| {
                let stage = Stage::parse(&stage).ok_or_else(|| {
                    ScribeError::Storage(format!("Unknown stage '{}' for session {}", stage, id))
                })?;
                let updated_at = DateTime::parse_from_rfc3339(&updated_at)
                    .with_context_fn(|| format!("Invalid timestamp for session {}", id))?
                    .with_timezone(&Utc);
                Ok(SessionSummary {
                    session_id: SessionId::new(id),
                    topic,
                    stage,
                    status: SessionStatus::parse(&status),
                    revision: revision as u64,
                    last_error,
                    updated_at,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Database, contract};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn in_memory() -> SqliteStore {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        SqliteStore::new(Arc::new(db))
    }

    #[test]
    fn test_store_contract() {
        contract::run_all(|| Box::new(in_memory()));
    }

    #[test]
    fn test_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sessions.db");
        let id = SessionId::new("persistent");

        {
            let db = Database::open(&path).unwrap();
            db.initialize().unwrap();
            let store = SqliteStore::new(Arc::new(db));
            store
                .create(&SessionCheckpoint::new(id.clone(), "durable topic"))
                .unwrap();
            store
                .update(&id, &mut |cp| {
                    cp.stage = Stage::OutlineGeneration;
                    Ok(())
                })
                .unwrap();
        }

        let db = Database::open(&path).unwrap();
        db.initialize().unwrap();
        let store = SqliteStore::new(Arc::new(db));
        let loaded = store.load(&id).unwrap();
        assert_eq!(loaded.state.topic, "durable topic");
        assert_eq!(loaded.stage, Stage::OutlineGeneration);
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_checksum_column_matches_stored_record() {
        let store = in_memory();
        let id = SessionId::new("sum");
        let mut checkpoint = SessionCheckpoint::new(id.clone(), "t");
        checkpoint.state.title = "edited without touch".to_string();
        checkpoint.checksum = 7;
        store.create(&checkpoint).unwrap();

        let column: i64 = store
            .db
            .connection()
            .unwrap()
            .query_row(
                "SELECT checksum FROM sessions WHERE id = ?1",
                params![id.as_str()],
                |row| row.get(0),
            )
            .unwrap();
        let loaded = store.load(&id).unwrap();
        assert_ne!(loaded.checksum, 7);
        assert_eq!(column, loaded.checksum as i64);
    }

    #[test]
    fn test_corrupted_record_rejected() {
        let store = in_memory();
        let id = SessionId::new("bad");
        store.create(&SessionCheckpoint::new(id.clone(), "t")).unwrap();
        store
            .db
            .connection()
            .unwrap()
            .execute(
                "UPDATE sessions SET checkpoint_data = replace(checkpoint_data, '\"t\"', '\"x\"')",
                [],
            )
            .unwrap();

        assert!(matches!(store.load(&id), Err(ScribeError::Checkpoint(_))));
    }
}
