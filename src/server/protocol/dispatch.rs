//! Routes decoded client intents to matchmaking and sessions, and fans the
//! results out to connection outboxes.
//!
//! Every session operation runs under that session's lock, and the messages it
//! produces are enqueued before the lock is released. Two intents on the same
//! session therefore reach every outbox in the order they were applied.

use std::sync::Arc;

use actix::Recipient;
use log::{debug, info, warn};

use super::messages::{ClientMessage, ServerMessage, decode};
use crate::game::Color;
use crate::server::connection::ConnectionRegistry;
use crate::server::game_session::GameSession;
use crate::server::game_session::store::SessionStore;
use crate::server::matchmaking::MatchmakingQueue;
use crate::server::matchmaking::types::JoinOutcome;
use crate::server::rating::GameCompleted;
use crate::server::types::{ConnectionId, Principal};
use crate::server::ws_error::GameError;

pub struct ProtocolRouter {
    registry: Arc<ConnectionRegistry>,
    sessions: Arc<SessionStore>,
    matchmaking: MatchmakingQueue,
    ratings: Recipient<GameCompleted>,
}

impl ProtocolRouter {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        sessions: Arc<SessionStore>,
        matchmaking: MatchmakingQueue,
        ratings: Recipient<GameCompleted>,
    ) -> Self {
        Self {
            registry,
            sessions,
            matchmaking,
            ratings,
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Handle one text frame received on `from`.
    pub fn dispatch(&self, from: ConnectionId, text: &str) {
        let msg = match decode(text) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("[Router] {} dropped frame: {}", from, e);
                return;
            }
        };
        debug!("[Router] {} -> {}", from, msg.kind());

        if let Err(err) = self.route(from, msg) {
            debug!("[Router] {} rejected: {}", from, err);
            self.registry.send(from, ServerMessage::error(&err));
        }
    }

    fn route(&self, from: ConnectionId, msg: ClientMessage) -> Result<(), GameError> {
        let principal = self
            .registry
            .principal_of(from)
            .ok_or(GameError::NotAuthenticated)?;

        match msg {
            ClientMessage::Join => {
                self.join(from, principal);
                Ok(())
            }
            ClientMessage::Ping => {
                self.registry.send(from, ServerMessage::Pong);
                Ok(())
            }
            ClientMessage::Move { game_id, mv } => self.with_seat(from, &game_id, |session, color| {
                let applied = session.apply_move(color, &mv)?;
                self.broadcast(
                    session,
                    ServerMessage::Move {
                        mv: applied.mv,
                        position: applied.position,
                        turn: applied.turn,
                    },
                );
                if let Some(verdict) = applied.verdict {
                    self.broadcast(session, ServerMessage::game_over(&verdict));
                    self.report_completion(session);
                }
                Ok(())
            }),
            ClientMessage::Resign { game_id } => self.with_seat(from, &game_id, |session, color| {
                let verdict = session.resign(color)?;
                self.broadcast(session, ServerMessage::game_over(&verdict));
                self.report_completion(session);
                Ok(())
            }),
            ClientMessage::DrawOffer { game_id } => {
                self.with_seat(from, &game_id, |session, color| {
                    session.offer_draw(color)?;
                    if let Some(opponent) = session.binding(color.opposite()).connection {
                        self.registry
                            .send(opponent, ServerMessage::DrawOffer { offered_by: color });
                    }
                    Ok(())
                })
            }
            ClientMessage::DrawResponse { game_id, accept } => {
                self.with_seat(from, &game_id, |session, _color| {
                    match session.respond_draw(accept)? {
                        Some(verdict) => {
                            self.broadcast(session, ServerMessage::game_over(&verdict));
                            self.report_completion(session);
                        }
                        None => {
                            self.broadcast(session, ServerMessage::DrawResponse { accepted: false })
                        }
                    }
                    Ok(())
                })
            }
            ClientMessage::TimeUpdate { game_id, time_left } => {
                self.with_seat(from, &game_id, |session, color| {
                    session.update_clock(color, time_left)?;
                    self.broadcast(session, ServerMessage::TimeUpdate { color, time_left });
                    Ok(())
                })
            }
            ClientMessage::Chat { game_id, message } => {
                self.with_seat(from, &game_id, |session, _color| {
                    session.append_chat(&principal.display_name, &message)?;
                    self.broadcast(
                        session,
                        ServerMessage::Chat {
                            sender: principal.display_name.clone(),
                            message,
                        },
                    );
                    Ok(())
                })
            }
            ClientMessage::Reconnect { game_id } => self.reconnect(from, &principal, &game_id),
        }
    }

    fn join(&self, from: ConnectionId, principal: Principal) {
        let pairing = match self.matchmaking.join(principal.clone(), from) {
            JoinOutcome::Waiting => {
                self.registry.send(from, ServerMessage::waiting());
                return;
            }
            JoinOutcome::Paired(pairing) => pairing,
        };

        let game_id = pairing.session_id;
        self.registry.note_binding(from, game_id);
        self.registry.note_binding(pairing.opponent_connection, game_id);

        // The waiting player may have dropped between leaving the slot and the
        // binding being noted; its teardown then missed this session.
        if !self.registry.is_registered(pairing.opponent_connection) {
            if let Ok(handle) = self.sessions.get(&game_id) {
                handle.lock().unbind_connection(pairing.opponent_connection);
            }
        }

        self.registry.send(
            pairing.opponent_connection,
            ServerMessage::GameStart {
                game_id,
                color: Color::White,
                opponent: principal.display_name,
            },
        );
        self.registry.send(
            from,
            ServerMessage::GameStart {
                game_id,
                color: pairing.color,
                opponent: pairing.opponent.display_name,
            },
        );
    }

    fn reconnect(
        &self,
        from: ConnectionId,
        principal: &Principal,
        game_id: &str,
    ) -> Result<(), GameError> {
        let handle = self.sessions.lookup(game_id)?;
        let mut session = handle.lock();
        let color = session.bind_connection(&principal.display_name, from)?;
        self.registry.note_binding(from, session.id());
        info!(
            "[Router] {} reconnected to game_id={} as {}",
            principal.display_name,
            session.id(),
            color
        );
        self.registry
            .send(from, ServerMessage::game_state(session.snapshot()));
        Ok(())
    }

    /// Resolve the session and the sender's seat in it, then run `op` under
    /// the session lock.
    fn with_seat<T>(
        &self,
        from: ConnectionId,
        game_id: &str,
        op: impl FnOnce(&mut GameSession, Color) -> Result<T, GameError>,
    ) -> Result<T, GameError> {
        let handle = self.sessions.lookup(game_id)?;
        let mut session = handle.lock();
        let color = session
            .color_of(from)
            .ok_or(GameError::PlayerNotInSession)?;
        op(&mut session, color)
    }

    fn broadcast(&self, session: &GameSession, msg: ServerMessage) {
        for connection in session.bound_connections() {
            self.registry.send(connection, msg.clone());
        }
    }

    fn report_completion(&self, session: &GameSession) {
        if let Some(done) = session.completion() {
            self.ratings.do_send(GameCompleted {
                session_id: done.session_id,
                white: done.white,
                black: done.black,
                verdict: done.verdict,
            });
        }
    }

    /// Connection teardown: forget the connection, free the waiting slot if it
    /// held it, and unbind it from every session it was seated in.
    pub fn disconnect(&self, handle: ConnectionId) {
        // Free the slot first so no new pairing picks up a dying connection.
        self.matchmaking.cancel(handle);
        let entry = self.registry.unregister(handle);

        let Some(entry) = entry else {
            return;
        };
        for game_id in entry.sessions() {
            if let Ok(session) = self.sessions.get(game_id) {
                session.lock().unbind_connection(handle);
            }
        }
        info!(
            "[Router] {} ({}) disconnected",
            entry.principal.display_name, handle
        );
    }
}
