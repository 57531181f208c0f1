//! Session registry
//!
//! Owns the live pick sessions and serializes access to each one: the
//! session state machine is synchronous, so every scan for a session
//! goes through that session's lock in arrival order.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::info;

use super::session::PickSession;

#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<String, Arc<Mutex<PickSession>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly seeded session, returning its id
    pub fn insert(&self, session: PickSession) -> String {
        let id = session.id().to_string();
        self.sessions
            .insert(id.clone(), Arc::new(Mutex::new(session)));
        info!(session_id = %id, "Session registered");
        id
    }

    pub fn get(&self, id: &str) -> Option<Arc<Mutex<PickSession>>> {
        self.sessions.get(id).map(|entry| entry.value().clone())
    }

    /// Drop a finished or abandoned session
    pub fn remove(&self, id: &str) -> bool {
        let removed = self.sessions.remove(id).is_some();
        if removed {
            info!(session_id = %id, "Session removed");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
