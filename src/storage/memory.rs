//! In-process checkpoint store.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::{CheckpointMutation, CheckpointStore, SessionSummary, encode};
use crate::types::{Result, ScribeError, SessionId};
use crate::workflow::SessionCheckpoint;

/// Checkpoints held as serialized JSON in a concurrent map.
///
/// Records are stored serialized so a load always yields an independent,
/// validated copy. `update` holds the shard lock for the session for the
/// duration of the mutation.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CheckpointStore for MemoryStore {
    fn create(&self, checkpoint: &SessionCheckpoint) -> Result<()> {
        let (json, _) = encode(checkpoint)?;
        match self.records.entry(checkpoint.session_id.to_string()) {
            Entry::Occupied(_) => Err(ScribeError::protocol(format!(
                "session {} already exists",
                checkpoint.session_id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(json);
                Ok(())
            }
        }
    }

    fn save(&self, checkpoint: &SessionCheckpoint) -> Result<()> {
        let (json, _) = encode(checkpoint)?;
        self.records.insert(checkpoint.session_id.to_string(), json);
        Ok(())
    }

    fn load(&self, id: &SessionId) -> Result<SessionCheckpoint> {
        let record = self
            .records
            .get(id.as_str())
            .ok_or_else(|| ScribeError::SessionNotFound(id.to_string()))?;
        Ok(SessionCheckpoint::from_json(record.value())?)
    }

    fn update(&self, id: &SessionId, mutate: CheckpointMutation<'_>) -> Result<SessionCheckpoint> {
        let mut record = self
            .records
            .get_mut(id.as_str())
            .ok_or_else(|| ScribeError::SessionNotFound(id.to_string()))?;

        let mut checkpoint = SessionCheckpoint::from_json(record.value())?;
        mutate(&mut checkpoint)?;
        checkpoint.touch();
        *record = checkpoint.to_json()?;
        Ok(checkpoint)
    }

    fn delete(&self, id: &SessionId) -> Result<bool> {
        Ok(self.records.remove(id.as_str()).is_some())
    }

    fn list(&self) -> Result<Vec<SessionSummary>> {
        let mut summaries = self
            .records
            .iter()
            .map(|entry| SessionCheckpoint::from_json(entry.value()).map(|cp| (&cp).into()))
            .collect::<std::result::Result<Vec<SessionSummary>, _>>()?;
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::contract;
    use std::sync::Arc;

    #[test]
    fn test_store_contract() {
        contract::run_all(|| Box::new(MemoryStore::new()));
    }

    #[test]
    fn test_concurrent_updates_serialize() {
        let store = Arc::new(MemoryStore::new());
        let checkpoint = SessionCheckpoint::new(SessionId::new("c"), "topic");
        store.create(&checkpoint).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..10 {
                        store
                            .update(&SessionId::new("c"), &mut |cp| {
                                cp.state.outline_revision += 1;
                                Ok(())
                            })
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let loaded = store.load(&SessionId::new("c")).unwrap();
        assert_eq!(loaded.state.outline_revision, 80);
        assert_eq!(loaded.revision, checkpoint.revision + 80);
    }
}
