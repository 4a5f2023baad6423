//! In-memory session storage.
//!
//! Each session sits behind its own mutex, so requests for different sessions never wait on
//! each other and no two sessions share state. The map lock is held only to look a session up.
//!
//! Sessions untouched for longer than the idle TTL are discarded: lazily when looked up, and
//! in a sweep before every insert. Once the cap is reached, new sessions are refused until
//! one expires or is deleted.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use triage_core::{QuizSession, SessionLimits};
use triage_uuid::UuidService;

pub type SharedSession = Arc<Mutex<QuizSession>>;

struct StoredSession {
    session: SharedSession,
    last_seen: Instant,
}

#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<UuidService, StoredSession>>>,
    limits: SessionLimits,
}

impl SessionStore {
    pub fn new(limits: SessionLimits) -> Self {
        Self {
            sessions: Arc::default(),
            limits,
        }
    }

    pub fn limits(&self) -> SessionLimits {
        self.limits
    }

    /// Stores `session` under a fresh id.
    ///
    /// Expired sessions are swept first. Returns `None` if the store is still full.
    pub async fn insert(&self, session: QuizSession) -> Option<(UuidService, SharedSession)> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;

        let before = sessions.len();
        sessions.retain(|_, stored| !self.is_expired(stored, now));
        let swept = before - sessions.len();
        if swept > 0 {
            tracing::info!(swept, "discarded idle sessions");
        }

        if sessions.len() >= self.limits.max_sessions {
            tracing::warn!(max = self.limits.max_sessions, "session store full");
            return None;
        }

        let id = UuidService::new();
        let shared = Arc::new(Mutex::new(session));
        sessions.insert(
            id.clone(),
            StoredSession {
                session: Arc::clone(&shared),
                last_seen: now,
            },
        );
        Some((id, shared))
    }

    /// Looks a session up and marks it as used. An expired session is discarded and not found.
    pub async fn get(&self, id: &UuidService) -> Option<SharedSession> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;

        let stored = sessions.get_mut(id)?;
        if self.is_expired(stored, now) {
            sessions.remove(id);
            tracing::debug!(session = %id, "idle session expired");
            return None;
        }
        stored.last_seen = now;
        Some(Arc::clone(&stored.session))
    }

    pub async fn remove(&self, id: &UuidService) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn is_expired(&self, stored: &StoredSession, now: Instant) -> bool {
        now.duration_since(stored.last_seen) >= self.limits.idle_ttl
    }
}
