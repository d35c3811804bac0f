//! Checkpoint Store
//!
//! Durable session records keyed by session id. Every write replaces the
//! whole checkpoint; `update` is an atomic read-modify-write where a failing
//! closure leaves the stored record untouched.

pub mod database;
mod memory;
mod sqlite;

pub use database::{Database, PoolConfig, SharedDatabase};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::config::{StorageBackend, StorageConfig};
use crate::types::{Result, SessionId};
use crate::workflow::{SessionCheckpoint, SessionStatus, Stage};

/// Listing row for a stored session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub topic: String,
    pub stage: Stage,
    pub status: SessionStatus,
    pub revision: u64,
    pub last_error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<&SessionCheckpoint> for SessionSummary {
    fn from(checkpoint: &SessionCheckpoint) -> Self {
        Self {
            session_id: checkpoint.session_id.clone(),
            topic: checkpoint.state.topic.clone(),
            stage: checkpoint.stage,
            status: checkpoint.status,
            revision: checkpoint.revision,
            last_error: checkpoint.last_error.clone(),
            updated_at: checkpoint.updated_at,
        }
    }
}

/// Mutation applied inside [`CheckpointStore::update`]
pub type CheckpointMutation<'a> = &'a mut dyn FnMut(&mut SessionCheckpoint) -> Result<()>;

/// Persistence for session checkpoints.
///
/// Implementations serialize writers per session id. Readers never observe a
/// partially written record.
pub trait CheckpointStore: Send + Sync {
    /// Insert a new session. Fails if the id is taken.
    fn create(&self, checkpoint: &SessionCheckpoint) -> Result<()>;

    /// Overwrite the stored record
    fn save(&self, checkpoint: &SessionCheckpoint) -> Result<()>;

    /// Load and validate; `SessionNotFound` when absent
    fn load(&self, id: &SessionId) -> Result<SessionCheckpoint>;

    /// Atomically apply `mutate` to the stored record and return the result.
    ///
    /// The checkpoint is touched after `mutate` succeeds. On error nothing is
    /// written.
    fn update(&self, id: &SessionId, mutate: CheckpointMutation<'_>) -> Result<SessionCheckpoint>;

    /// Remove a session. Returns whether it existed.
    fn delete(&self, id: &SessionId) -> Result<bool>;

    /// All sessions, most recently updated first
    fn list(&self) -> Result<Vec<SessionSummary>>;
}

pub type SharedStore = Arc<dyn CheckpointStore>;

/// Open the configured backend
pub fn open_store(config: &StorageConfig) -> Result<SharedStore> {
    match config.backend {
        StorageBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StorageBackend::Sqlite => {
            if let Some(parent) = config.database_path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)?;
            }
            let db = Database::open(&config.database_path)?;
            db.initialize()?;
            info!(path = %config.database_path.display(), "Opened checkpoint database");
            Ok(Arc::new(SqliteStore::new(Arc::new(db))))
        }
    }
}

/// Serialize with a fresh checksum without mutating the caller's copy.
///
/// Returns the JSON together with the checksum embedded in it.
fn encode(checkpoint: &SessionCheckpoint) -> Result<(String, u32)> {
    let mut record = checkpoint.clone();
    let json = record.to_json()?;
    Ok((json, record.checksum))
}

/// Shared behavior checks run against every backend
#[cfg(test)]
pub(crate) mod contract {
    use super::*;
    use crate::types::{ScribeError, Section};

    fn checkpoint(id: &str) -> SessionCheckpoint {
        SessionCheckpoint::new(SessionId::new(id), format!("topic {}", id))
    }

    pub fn create_load_roundtrip(store: &dyn CheckpointStore) {
        let original = checkpoint("a");
        store.create(&original).unwrap();
        let loaded = store.load(&original.session_id).unwrap();
        assert_eq!(loaded.state.topic, "topic a");
        assert_eq!(loaded.stage, Stage::InitialResearch);
    }

    pub fn duplicate_create_rejected(store: &dyn CheckpointStore) {
        store.create(&checkpoint("dup")).unwrap();
        assert!(matches!(
            store.create(&checkpoint("dup")),
            Err(ScribeError::ProtocolViolation(_))
        ));
    }

    pub fn missing_session(store: &dyn CheckpointStore) {
        let id = SessionId::new("ghost");
        assert!(matches!(store.load(&id), Err(ScribeError::SessionNotFound(_))));
        assert!(matches!(
            store.update(&id, &mut |_| Ok(())),
            Err(ScribeError::SessionNotFound(_))
        ));
        assert!(!store.delete(&id).unwrap());
    }

    pub fn update_applies_and_touches(store: &dyn CheckpointStore) {
        let original = checkpoint("u");
        store.create(&original).unwrap();

        let updated = store
            .update(&original.session_id, &mut |cp| {
                cp.state
                    .set_outline("Title".to_string(), vec![Section::new(0, "Intro", "", false)]);
                cp.stage = Stage::HumanReview;
                Ok(())
            })
            .unwrap();

        assert_eq!(updated.revision, original.revision + 1);
        let loaded = store.load(&original.session_id).unwrap();
        assert_eq!(loaded, updated);
        assert_eq!(loaded.state.sections.len(), 1);
    }

    pub fn failed_update_writes_nothing(store: &dyn CheckpointStore) {
        let original = checkpoint("f");
        store.create(&original).unwrap();

        let result = store.update(&original.session_id, &mut |cp| {
            cp.stage = Stage::Compile;
            Err(ScribeError::protocol("rejected"))
        });
        assert!(result.is_err());

        let loaded = store.load(&original.session_id).unwrap();
        assert_eq!(loaded.stage, Stage::InitialResearch);
        assert_eq!(loaded.revision, original.revision);
    }

    pub fn save_overwrites_and_lists(store: &dyn CheckpointStore) {
        let mut first = checkpoint("l1");
        store.create(&first).unwrap();
        store.create(&checkpoint("l2")).unwrap();

        first.stage = Stage::OutlineGeneration;
        first.touch();
        store.save(&first).unwrap();

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].session_id.as_str(), "l1");
        assert_eq!(listed[0].stage, Stage::OutlineGeneration);

        assert!(store.delete(&first.session_id).unwrap());
        assert_eq!(store.list().unwrap().len(), 1);
    }

    pub fn run_all(make: impl Fn() -> Box<dyn CheckpointStore>) {
        create_load_roundtrip(make().as_ref());
        duplicate_create_rejected(make().as_ref());
        missing_session(make().as_ref());
        update_applies_and_touches(make().as_ref());
        failed_update_writes_nothing(make().as_ref());
        save_overwrites_and_lists(make().as_ref());
    }
}
