//! In-memory registry of live sessions for the HTTP surface.
//!
//! Each session sits behind its own async mutex, so a message in flight
//! blocks only that session. Sessions idle for longer than the configured
//! timeout are discarded on the next insert. Nothing is persisted.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use super::ConversationSession;

/// Shared handle to one live session.
pub type SessionHandle = Arc<Mutex<ConversationSession>>;

/// Errors registering a session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The live-session limit is reached even after evicting idle sessions.
    #[error("too many active sessions (limit {limit})")]
    Full {
        /// Configured limit.
        limit: usize,
    },
}

/// Live sessions keyed by id.
#[derive(Debug)]
pub struct SessionStore {
    sessions: Mutex<HashMap<Uuid, SessionHandle>>,
    idle_timeout: Duration,
    max_sessions: usize,
}

impl SessionStore {
    /// Create an empty store.
    pub fn new(idle_timeout: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_timeout,
            max_sessions,
        }
    }

    /// Register a new session and return its shared handle.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Full`] when the limit is reached after eviction.
    pub async fn insert(&self, session: ConversationSession) -> Result<SessionHandle, StoreError> {
        let mut sessions = self.sessions.lock().await;
        Self::evict_locked(&mut sessions, self.idle_timeout, Instant::now());

        if sessions.len() >= self.max_sessions {
            return Err(StoreError::Full {
                limit: self.max_sessions,
            });
        }

        let id = session.id();
        let handle = Arc::new(Mutex::new(session));
        sessions.insert(id, Arc::clone(&handle));
        debug!(session_id = %id, live = sessions.len(), "session stored");
        Ok(handle)
    }

    /// Look up a live session and restart its idle clock unless it is busy.
    pub async fn get(&self, id: Uuid) -> Option<SessionHandle> {
        let sessions = self.sessions.lock().await;
        let handle = sessions.get(&id).cloned()?;
        if let Ok(mut session) = handle.try_lock() {
            session.touch();
        }
        Some(handle)
    }

    /// Whether `id` is still live.
    pub async fn contains(&self, id: Uuid) -> bool {
        self.sessions.lock().await.contains_key(&id)
    }

    /// End a session. Returns whether it existed.
    pub async fn remove(&self, id: Uuid) -> bool {
        let removed = self.sessions.lock().await.remove(&id).is_some();
        if removed {
            info!(session_id = %id, "session closed");
        }
        removed
    }

    /// Discard sessions idle since before `now - idle_timeout`.
    ///
    /// Sessions with a message in flight are never discarded.
    /// Returns the number of sessions removed.
    pub async fn evict_idle_at(&self, now: Instant) -> usize {
        let mut sessions = self.sessions.lock().await;
        Self::evict_locked(&mut sessions, self.idle_timeout, now)
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Whether no session is live.
    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    fn evict_locked(
        sessions: &mut HashMap<Uuid, SessionHandle>,
        idle_timeout: Duration,
        now: Instant,
    ) -> usize {
        let before = sessions.len();
        sessions.retain(|_, handle| match handle.try_lock() {
            Ok(session) => now.saturating_duration_since(session.last_active()) < idle_timeout,
            Err(_) => true,
        });
        let evicted = before.saturating_sub(sessions.len());
        if evicted > 0 {
            info!(evicted, live = sessions.len(), "idle sessions discarded");
        }
        evicted
    }
}
