//! Capacity-bounded registry of live sessions.
//!
//! Capacity check and insert happen under a single write guard, so the cap
//! holds under concurrent creates and is enforced before any agent
//! resources exist. The lock only ever guards map operations; callers work
//! on `Arc<Session>` clones outside it.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use uplink_core::SessionId;

use crate::errors::OrchestratorError;
use crate::session::Session;

/// Registry of live sessions, bounded by a concurrent-session cap.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, Arc<Session>>>,
    max_sessions: usize,
}

impl SessionRegistry {
    /// Create a registry with the given session cap.
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions,
        }
    }

    /// Insert a new session, enforcing the cap atomically.
    pub fn insert(&self, session: Arc<Session>) -> Result<(), OrchestratorError> {
        let mut sessions = self.sessions.write();
        if sessions.len() >= self.max_sessions {
            return Err(OrchestratorError::CapacityExceeded {
                limit: self.max_sessions,
            });
        }
        let _ = sessions.insert(session.id().clone(), session);
        Ok(())
    }

    /// Look up a live session.
    pub fn get(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.read().get(id).cloned()
    }

    /// Remove a session, returning it if present.
    pub fn remove(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.write().remove(id)
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Clone out the current set of sessions (for sweeps).
    pub fn snapshot(&self) -> Vec<Arc<Session>> {
        self.sessions.read().values().cloned().collect()
    }

    /// Remove and return every session (for shutdown).
    pub fn drain(&self) -> Vec<Arc<Session>> {
        self.sessions.write().drain().map(|(_, s)| s).collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
