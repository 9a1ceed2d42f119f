//! Concurrent registry of live and recently completed sessions.
//!
//! The map itself is sharded; each session sits behind its own mutex, so two
//! games never contend with each other.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use log::debug;
use parking_lot::Mutex;

use super::session::GameSession;
use crate::server::types::SessionId;
use crate::server::ws_error::GameError;

pub type SessionHandle = Arc<Mutex<GameSession>>;

#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<SessionId, SessionHandle>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, session: GameSession) -> SessionHandle {
        let id = session.id();
        let handle = Arc::new(Mutex::new(session));
        self.sessions.insert(id, handle.clone());
        debug!("[SessionStore] Inserted game_id={}", id);
        handle
    }

    /// Clone the handle out so the shard lock is released before the session
    /// lock is taken.
    pub fn get(&self, id: &SessionId) -> Result<SessionHandle, GameError> {
        self.sessions
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or(GameError::GameNotFound)
    }

    /// Look up by the raw `gameId` a client sent.
    pub fn lookup(&self, raw_id: &str) -> Result<SessionHandle, GameError> {
        let id = SessionId::parse(raw_id).ok_or(GameError::GameNotFound)?;
        self.get(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.handles()
            .iter()
            .filter(|handle| handle.lock().is_active())
            .count()
    }

    fn handles(&self) -> Vec<SessionHandle> {
        self.sessions.iter().map(|e| e.value().clone()).collect()
    }

    /// Drop sessions that completed more than `retention` before `now`.
    /// Active sessions are never removed. Returns the evicted ids.
    pub fn reap_completed(&self, retention: Duration, now: Instant) -> Vec<SessionId> {
        let expired: Vec<SessionId> = self
            .handles()
            .iter()
            .filter_map(|handle| {
                let session = handle.lock();
                let completed_at = session.completed_at()?;
                (now.saturating_duration_since(completed_at) >= retention).then(|| session.id())
            })
            .collect();
        for id in &expired {
            self.sessions.remove(id);
        }
        expired
    }
}
