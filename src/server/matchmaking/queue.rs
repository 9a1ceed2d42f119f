/// Matchmaking queue: one waiting slot, pairing arrivals two by two.
///
/// The first arrival waits and will play White. The next arrival takes the
/// slot, and a new session (waiting entry as White, arrival as Black) is built
/// and inserted into the store while the slot lock is still held, so two
/// concurrent joins can never both pair with the same entry or both see an
/// empty slot.
use std::sync::Arc;

use log::{debug, info};
use parking_lot::Mutex;

use super::types::{JoinOutcome, Pairing, WaitingEntry};
use crate::game::{Color, RulesOracle};
use crate::server::game_session::session::{GameSession, PlayerBinding};
use crate::server::game_session::store::SessionStore;
use crate::server::types::{ConnectionId, Principal, SessionId};

pub struct MatchmakingQueue {
    slot: Mutex<Option<WaitingEntry>>,
    sessions: Arc<SessionStore>,
    oracle: Arc<dyn RulesOracle>,
    clock_seconds: f64,
}

impl MatchmakingQueue {
    pub fn new(sessions: Arc<SessionStore>, oracle: Arc<dyn RulesOracle>, clock_seconds: f64) -> Self {
        Self {
            slot: Mutex::new(None),
            sessions,
            oracle,
            clock_seconds,
        }
    }

    pub fn join(&self, principal: Principal, connection: ConnectionId) -> JoinOutcome {
        let mut slot = self.slot.lock();
        let arriving = WaitingEntry {
            principal,
            connection,
        };
        match slot.take() {
            None => {
                debug!(
                    "[Matchmaking] {} waiting for an opponent",
                    arriving.principal.display_name
                );
                *slot = Some(arriving);
                JoinOutcome::Waiting
            }
            Some(waiting) if waiting.principal.id == arriving.principal.id => {
                // Same player again (new tab, retry): refresh the connection.
                debug!(
                    "[Matchmaking] {} re-joined, waiting on {}",
                    arriving.principal.display_name, arriving.connection
                );
                *slot = Some(arriving);
                JoinOutcome::Waiting
            }
            Some(waiting) => {
                let pairing = self.create_session(waiting, arriving);
                JoinOutcome::Paired(pairing)
            }
        }
    }

    /// Called with the slot lock held.
    fn create_session(&self, white: WaitingEntry, black: WaitingEntry) -> Pairing {
        let session_id = SessionId::new();
        let session = GameSession::new(
            session_id,
            PlayerBinding::new(white.principal.clone(), Color::White, white.connection),
            PlayerBinding::new(black.principal.clone(), Color::Black, black.connection),
            self.oracle.new_game(),
            self.clock_seconds,
        );
        self.sessions.insert(session);
        info!(
            "[Matchmaking] Game created game_id={} white={} black={}",
            session_id, white.principal.display_name, black.principal.display_name
        );
        Pairing {
            session_id,
            color: Color::Black,
            opponent: white.principal,
            opponent_connection: white.connection,
        }
    }

    /// Drop the waiting entry if it belongs to `connection`.
    pub fn cancel(&self, connection: ConnectionId) -> bool {
        let mut slot = self.slot.lock();
        if slot.as_ref().is_some_and(|w| w.connection == connection) {
            let entry = slot.take();
            debug!(
                "[Matchmaking] {:?} left the waiting slot",
                entry.map(|e| e.principal.display_name)
            );
            true
        } else {
            false
        }
    }

    #[cfg(test)]
    pub fn waiting(&self) -> Option<WaitingEntry> {
        self.slot.lock().clone()
    }
}
