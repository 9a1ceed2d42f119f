//! State machine for one match.
//!
//! A `GameSession` is only ever reached through the `Mutex` the session store
//! wraps it in, so every method here runs with the session lock held. Methods
//! that fail leave the session untouched.

use std::time::Instant;

use log::{debug, info};

use crate::game::{Board, Color, Method, Outcome, Verdict};
use crate::server::types::{ConnectionId, Principal, SessionId};
use crate::server::ws_error::GameError;

/// A color's seat in the session. `connection` is `None` while that player
/// is disconnected; reconnecting swaps the handle in place.
#[derive(Debug, Clone)]
pub struct PlayerBinding {
    pub principal: Principal,
    pub color: Color,
    pub connection: Option<ConnectionId>,
}

impl PlayerBinding {
    pub fn new(principal: Principal, color: Color, connection: ConnectionId) -> Self {
        Self {
            principal,
            color,
            connection: Some(connection),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clock {
    pub white_seconds: f64,
    pub black_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEntry {
    pub sender: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Active,
    Completed(Verdict),
}

/// Read-only projection replayed to a reconnecting player.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub position: String,
    pub turn: Color,
    pub white_name: String,
    pub black_name: String,
    pub white_seconds: f64,
    pub black_seconds: f64,
}

/// Result of an accepted move, ready for broadcast.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveApplied {
    pub mv: String,
    pub position: String,
    pub turn: Color,
    /// Set when this move ended the game.
    pub verdict: Option<Verdict>,
}

/// Everything the rating updater needs once a session completes.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub session_id: SessionId,
    pub white: Principal,
    pub black: Principal,
    pub verdict: Verdict,
}

pub struct GameSession {
    id: SessionId,
    white: PlayerBinding,
    black: PlayerBinding,
    board: Box<dyn Board>,
    current_turn: Color,
    draw_offered: bool,
    clock: Clock,
    chat_log: Vec<ChatEntry>,
    status: SessionStatus,
    completed_at: Option<Instant>,
}

impl GameSession {
    pub fn new(
        id: SessionId,
        white: PlayerBinding,
        black: PlayerBinding,
        board: Box<dyn Board>,
        clock_seconds: f64,
    ) -> Self {
        Self {
            id,
            white,
            black,
            current_turn: board.side_to_move(),
            board,
            draw_offered: false,
            clock: Clock {
                white_seconds: clock_seconds,
                black_seconds: clock_seconds,
            },
            chat_log: Vec::new(),
            status: SessionStatus::Active,
            completed_at: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    pub fn current_turn(&self) -> Color {
        self.current_turn
    }

    pub fn draw_offered(&self) -> bool {
        self.draw_offered
    }

    pub fn clock(&self) -> Clock {
        self.clock
    }

    pub fn chat_log(&self) -> &[ChatEntry] {
        &self.chat_log
    }

    pub fn completed_at(&self) -> Option<Instant> {
        self.completed_at
    }

    pub fn binding(&self, color: Color) -> &PlayerBinding {
        match color {
            Color::White => &self.white,
            Color::Black => &self.black,
        }
    }

    fn binding_mut(&mut self, color: Color) -> &mut PlayerBinding {
        match color {
            Color::White => &mut self.white,
            Color::Black => &mut self.black,
        }
    }

    /// Color seated at `connection`, if it is bound to this session.
    pub fn color_of(&self, connection: ConnectionId) -> Option<Color> {
        [Color::White, Color::Black]
            .into_iter()
            .find(|c| self.binding(*c).connection == Some(connection))
    }

    /// Connections currently bound, skipping disconnected colors.
    pub fn bound_connections(&self) -> Vec<ConnectionId> {
        [self.white.connection, self.black.connection]
            .into_iter()
            .flatten()
            .collect()
    }

    /// Completion record, once the session is over.
    pub fn completion(&self) -> Option<Completion> {
        match self.status {
            SessionStatus::Completed(verdict) => Some(Completion {
                session_id: self.id,
                white: self.white.principal.clone(),
                black: self.black.principal.clone(),
                verdict,
            }),
            SessionStatus::Active => None,
        }
    }

    fn ensure_active(&self) -> Result<(), GameError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(GameError::GameNotActive)
        }
    }

    fn complete(&mut self, verdict: Verdict) {
        self.status = SessionStatus::Completed(verdict);
        self.draw_offered = false;
        self.completed_at = Some(Instant::now());
        info!(
            "[GameSession] game_id={} completed: {} by {}",
            self.id, verdict.outcome, verdict.method
        );
    }

    pub fn apply_move(&mut self, color: Color, text: &str) -> Result<MoveApplied, GameError> {
        self.ensure_active()?;
        if color != self.current_turn {
            return Err(GameError::NotYourTurn);
        }
        self.board.apply_move(text)?;

        self.current_turn = self.current_turn.opposite();
        self.draw_offered = false;
        let verdict = self.board.outcome();
        if let Some(verdict) = verdict {
            self.complete(verdict);
        }
        debug!(
            "[GameSession] game_id={} {} played {}",
            self.id, color, text
        );
        Ok(MoveApplied {
            mv: text.to_string(),
            position: self.board.render(),
            turn: self.current_turn,
            verdict,
        })
    }

    /// `color` forfeits; the opponent wins by resignation.
    pub fn resign(&mut self, color: Color) -> Result<Verdict, GameError> {
        self.ensure_active()?;
        let verdict = Verdict::new(Outcome::win_for(color.opposite()), Method::Resignation);
        self.complete(verdict);
        Ok(verdict)
    }

    /// Either player may offer at any time; repeated offers are idempotent.
    pub fn offer_draw(&mut self, color: Color) -> Result<(), GameError> {
        self.ensure_active()?;
        self.draw_offered = true;
        debug!("[GameSession] game_id={} draw offered by {}", self.id, color);
        Ok(())
    }

    /// Returns the verdict when the offer is accepted.
    pub fn respond_draw(&mut self, accept: bool) -> Result<Option<Verdict>, GameError> {
        self.ensure_active()?;
        if !self.draw_offered {
            return Err(GameError::NoDrawPending);
        }
        if accept {
            let verdict = Verdict::new(Outcome::Draw, Method::Agreement);
            self.complete(verdict);
            Ok(Some(verdict))
        } else {
            self.draw_offered = false;
            Ok(None)
        }
    }

    /// Overwrites the stored remaining time as reported by the client.
    pub fn update_clock(&mut self, color: Color, seconds_remaining: f64) -> Result<(), GameError> {
        self.ensure_active()?;
        match color {
            Color::White => self.clock.white_seconds = seconds_remaining,
            Color::Black => self.clock.black_seconds = seconds_remaining,
        }
        Ok(())
    }

    pub fn append_chat(&mut self, sender: &str, text: &str) -> Result<(), GameError> {
        self.ensure_active()?;
        self.chat_log.push(ChatEntry {
            sender: sender.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    /// Reconnection: re-seat the player named `display_name` on `connection`.
    /// Turn, clocks and chat are untouched. Allowed on completed sessions.
    pub fn bind_connection(
        &mut self,
        display_name: &str,
        connection: ConnectionId,
    ) -> Result<Color, GameError> {
        let color = [Color::White, Color::Black]
            .into_iter()
            .find(|c| self.binding(*c).principal.display_name == display_name)
            .ok_or(GameError::PlayerNotInSession)?;
        let binding = self.binding_mut(color);
        let previous = binding.connection.replace(connection);
        debug!(
            "[GameSession] game_id={} {} rebound {:?} -> {}",
            self.id, color, previous, connection
        );
        Ok(color)
    }

    /// Teardown: nil the binding still held by `connection`. A binding that
    /// was already replaced by a newer connection is left alone.
    pub fn unbind_connection(&mut self, connection: ConnectionId) -> Option<Color> {
        let color = self.color_of(connection)?;
        self.binding_mut(color).connection = None;
        debug!(
            "[GameSession] game_id={} {} disconnected ({})",
            self.id, color, connection
        );
        Some(color)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            position: self.board.render(),
            turn: self.current_turn,
            white_name: self.white.principal.display_name.clone(),
            black_name: self.black.principal.display_name.clone(),
            white_seconds: self.clock.white_seconds,
            black_seconds: self.clock.black_seconds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::RulesOracle;
    use crate::game::chess::ChessOracle;

    const WHITE_CONN: ConnectionId = ConnectionId(1);
    const BLACK_CONN: ConnectionId = ConnectionId(2);

    fn new_session() -> GameSession {
        GameSession::new(
            SessionId::new(),
            PlayerBinding::new(Principal::new("u1", "alice"), Color::White, WHITE_CONN),
            PlayerBinding::new(Principal::new("u2", "bob"), Color::Black, BLACK_CONN),
            ChessOracle.new_game(),
            600.0,
        )
    }

    #[test]
    fn turns_alternate_strictly() {
        let mut session = new_session();
        let moves = ["e4", "e5", "Nf3", "Nc6", "Bb5", "a6"];
        let mut expected = Color::White;
        for mv in moves {
            assert_eq!(session.current_turn(), expected);
            let applied = session.apply_move(expected, mv).unwrap();
            expected = expected.opposite();
            assert_eq!(applied.turn, expected);
            assert!(applied.verdict.is_none());
        }
        assert_eq!(session.current_turn(), Color::White);
    }

    #[test]
    fn out_of_turn_move_changes_nothing() {
        let mut session = new_session();
        session.update_clock(Color::White, 512.5).unwrap();
        let before = session.snapshot();

        assert_eq!(
            session.apply_move(Color::Black, "e5"),
            Err(GameError::NotYourTurn)
        );
        assert_eq!(session.snapshot(), before);
        assert_eq!(session.current_turn(), Color::White);
    }

    #[test]
    fn illegal_move_passes_the_oracle_message_through() {
        let mut session = new_session();
        let before = session.snapshot();
        let err = session.apply_move(Color::White, "e5").unwrap_err();
        assert_eq!(err, GameError::InvalidMove("illegal move 'e5'".to_string()));
        assert_eq!(session.snapshot(), before);
    }

    #[test]
    fn a_move_clears_a_pending_draw_offer() {
        let mut session = new_session();
        session.offer_draw(Color::Black).unwrap();
        assert!(session.draw_offered());
        session.apply_move(Color::White, "d4").unwrap();
        assert!(!session.draw_offered());
    }

    #[test]
    fn checkmate_completes_the_session() {
        let mut session = new_session();
        for (color, mv) in [
            (Color::White, "f3"),
            (Color::Black, "e5"),
            (Color::White, "g4"),
        ] {
            session.apply_move(color, mv).unwrap();
        }
        let applied = session.apply_move(Color::Black, "Qh4#").unwrap();
        let verdict = Verdict::new(Outcome::BlackWon, Method::Checkmate);
        assert_eq!(applied.verdict, Some(verdict));
        assert_eq!(session.status(), SessionStatus::Completed(verdict));
        assert!(session.completed_at().is_some());

        let completion = session.completion().unwrap();
        assert_eq!(completion.white.display_name, "alice");
        assert_eq!(completion.verdict, verdict);

        assert_eq!(
            session.apply_move(Color::White, "a3"),
            Err(GameError::GameNotActive)
        );
    }

    #[test]
    fn resignation_hands_the_win_to_the_opponent() {
        let mut session = new_session();
        let verdict = session.resign(Color::White).unwrap();
        assert_eq!(verdict, Verdict::new(Outcome::BlackWon, Method::Resignation));
        assert_eq!(session.resign(Color::Black), Err(GameError::GameNotActive));
        assert_eq!(session.offer_draw(Color::Black), Err(GameError::GameNotActive));
        assert_eq!(
            session.append_chat("bob", "gg"),
            Err(GameError::GameNotActive)
        );
    }

    #[test]
    fn draw_protocol() {
        let mut session = new_session();
        assert_eq!(session.respond_draw(true), Err(GameError::NoDrawPending));

        session.offer_draw(Color::White).unwrap();
        session.offer_draw(Color::White).unwrap();
        assert_eq!(session.respond_draw(false), Ok(None));
        assert!(!session.draw_offered());
        assert!(session.is_active());

        assert_eq!(session.respond_draw(true), Err(GameError::NoDrawPending));

        session.offer_draw(Color::Black).unwrap();
        let verdict = session.respond_draw(true).unwrap();
        assert_eq!(verdict, Some(Verdict::new(Outcome::Draw, Method::Agreement)));
        assert!(!session.is_active());
        assert!(!session.draw_offered());
    }

    #[test]
    fn clocks_and_chat() {
        let mut session = new_session();
        session.update_clock(Color::Black, 1234.0).unwrap();
        session.update_clock(Color::Black, 12.0).unwrap();
        assert_eq!(session.clock().black_seconds, 12.0);
        assert_eq!(session.clock().white_seconds, 600.0);

        session.append_chat("alice", "gl").unwrap();
        session.append_chat("bob", "hf").unwrap();
        let senders: Vec<_> = session.chat_log().iter().map(|c| c.sender.as_str()).collect();
        assert_eq!(senders, ["alice", "bob"]);
    }

    #[test]
    fn reconnect_restores_the_same_snapshot() {
        let mut session = new_session();
        session.apply_move(Color::White, "e4").unwrap();
        session.update_clock(Color::White, 590.0).unwrap();
        let before = session.snapshot();

        assert_eq!(session.unbind_connection(BLACK_CONN), Some(Color::Black));
        assert_eq!(session.bound_connections(), vec![WHITE_CONN]);

        let new_conn = ConnectionId(7);
        assert_eq!(session.bind_connection("bob", new_conn), Ok(Color::Black));
        assert_eq!(session.color_of(new_conn), Some(Color::Black));
        assert_eq!(session.snapshot(), before);
        assert_eq!(session.current_turn(), Color::Black);
    }

    #[test]
    fn stale_teardown_does_not_clear_a_newer_binding() {
        let mut session = new_session();
        session.bind_connection("alice", ConnectionId(9)).unwrap();
        assert_eq!(session.unbind_connection(WHITE_CONN), None);
        assert_eq!(session.color_of(ConnectionId(9)), Some(Color::White));
    }

    #[test]
    fn strangers_cannot_bind() {
        let mut session = new_session();
        assert_eq!(
            session.bind_connection("mallory", ConnectionId(3)),
            Err(GameError::PlayerNotInSession)
        );
    }

    #[test]
    fn racing_moves_by_one_seat_apply_exactly_once() {
        use crate::server::game_session::store::SessionStore;
        use std::sync::{Arc, Barrier};
        use std::thread;

        for _ in 0..50 {
            let store = SessionStore::new();
            let handle = store.insert(new_session());
            let barrier = Arc::new(Barrier::new(2));

            let racers: Vec<_> = ["e4", "d4"]
                .into_iter()
                .map(|mv| {
                    let handle = handle.clone();
                    let barrier = barrier.clone();
                    thread::spawn(move || {
                        barrier.wait();
                        handle.lock().apply_move(Color::White, mv)
                    })
                })
                .collect();
            let results: Vec<_> = racers.into_iter().map(|r| r.join().unwrap()).collect();

            assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
            assert!(results.contains(&Err(GameError::NotYourTurn)));

            let session = handle.lock();
            assert_eq!(session.current_turn(), Color::Black);
            let played = results.iter().find_map(|r| r.as_ref().ok()).unwrap();
            assert_eq!(session.snapshot().position, played.position);
        }
    }
}
