//! In-process session leases: at most one driver per session id.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use tracing::debug;

use crate::types::{Result, ScribeError, SessionId};

#[derive(Debug, Clone, Default)]
pub struct SessionLeases {
    held: Arc<DashMap<SessionId, ()>>,
}

impl SessionLeases {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the lease for `id`, or fail with `SessionBusy`
    pub fn acquire(&self, id: &SessionId) -> Result<SessionLease> {
        match self.held.entry(id.clone()) {
            Entry::Occupied(_) => Err(ScribeError::SessionBusy(id.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(());
                debug!(session = %id, "Lease acquired");
                Ok(SessionLease {
                    id: id.clone(),
                    held: self.held.clone(),
                })
            }
        }
    }
}

/// Released on drop
#[derive(Debug)]
pub struct SessionLease {
    id: SessionId,
    held: Arc<DashMap<SessionId, ()>>,
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        self.held.remove(&self.id);
        debug!(session = %self.id, "Lease released");
    }
}
