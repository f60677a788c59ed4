//! Per-conversation session state
//!
//! Sessions are created lazily on first message, mutated only by the
//! orchestrator while it holds the per-session lock, and never destroyed
//! automatically. Concurrent requests for the same session id serialize on
//! that lock; different sessions proceed independently.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// One customer/agent exchange
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub customer: String,
    pub agent: String,
}

/// Mutable per-conversation state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    /// Slot values captured so far
    pub captured_context: BTreeMap<String, String>,
    /// Verbatim customer quotes, in capture order
    pub captured_quotes: Vec<String>,
    pub conversation_history: Vec<Turn>,
    /// Principle ids applied so far, in order
    pub principle_history: Vec<String>,
    pub resistance_count: u32,
}

impl Session {
    pub fn turn_count(&self) -> usize {
        self.conversation_history.len()
    }
}

/// Process-wide session registry with per-session exclusion
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the lock handle for a session, creating the session lazily.
    ///
    /// The caller holds the returned mutex for the whole request so that
    /// interleaved context merges cannot lose updates.
    pub fn get_or_create(&self, session_id: &str) -> Arc<Mutex<Session>> {
        if let Some(session) = self.sessions.read().unwrap().get(session_id) {
            return Arc::clone(session);
        }

        let mut sessions = self.sessions.write().unwrap();
        Arc::clone(
            sessions
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(Session::default()))),
        )
    }

    /// Snapshot a session's current state, if it exists
    pub async fn snapshot(&self, session_id: &str) -> Option<Session> {
        let handle = {
            let sessions = self.sessions.read().unwrap();
            sessions.get(session_id).cloned()
        };

        match handle {
            Some(session) => Some(session.lock().await.clone()),
            None => None,
        }
    }

    /// Remove a session; returns whether it existed
    pub fn clear(&self, session_id: &str) -> bool {
        self.sessions.write().unwrap().remove(session_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().unwrap().is_empty()
    }

    /// Drop all sessions (testing hook)
    pub fn reset(&self) {
        self.sessions.write().unwrap().clear();
    }
}
