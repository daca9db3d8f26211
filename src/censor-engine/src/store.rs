//! Per-user session storage

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use std::time::Instant;

/// Opaque user key, the chat platform's numeric user id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a live session is in the dialogue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    AwaitingPhoto,
    AwaitingPhrase { pending_image: PathBuf },
}

/// One user's in-progress redaction dialogue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    /// Platform handle, used only to name the user's storage directory
    pub username: Option<String>,
    pub state: SessionState,
    /// Last time the user moved the dialogue forward
    pub updated_at: Instant,
}

impl Session {
    pub fn new(id: SessionId, username: Option<String>) -> Self {
        Self {
            id,
            username,
            state: SessionState::AwaitingPhoto,
            updated_at: Instant::now(),
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Instant::now();
    }

    pub fn pending_image(&self) -> Option<&Path> {
        match &self.state {
            SessionState::AwaitingPhoto => None,
            SessionState::AwaitingPhrase { pending_image } => Some(pending_image),
        }
    }
}

/// Storage for live sessions.
///
/// The dialogue is the only writer for a given id; entries for different ids
/// are independent.
pub trait SessionStore: Send + Sync {
    fn get(&self, id: SessionId) -> Option<Session>;
    fn put(&self, session: Session);
    fn remove(&self, id: SessionId) -> Option<Session>;
    /// Sessions not updated since `cutoff`
    fn idle_since(&self, cutoff: Instant) -> Vec<SessionId>;
}

/// In-process session store
#[derive(Debug, Default)]
pub struct MemoryStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, id: SessionId) -> Option<Session> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    fn put(&self, session: Session) {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session.id, session);
    }

    fn remove(&self, id: SessionId) -> Option<Session> {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
    }

    fn idle_since(&self, cutoff: Instant) -> Vec<SessionId> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|session| session.updated_at <= cutoff)
            .map(|session| session.id)
            .collect()
    }
}
