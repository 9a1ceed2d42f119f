/// Seam between the session state machine and the chess rules.
///
/// A session only ever talks to its board through [`Board`]; the concrete rules
/// (see `game::chess`) are chosen once at startup through [`RulesOracle`].
use thiserror::Error;

use super::types::{Color, Verdict};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RulesError {
    /// The text could not be read as a move at all.
    #[error("unreadable move '{0}'")]
    Unreadable(String),

    /// The move is well formed but not legal in the current position.
    #[error("illegal move '{0}'")]
    Illegal(String),

    /// The position is already terminal.
    #[error("game is already over")]
    GameOver,
}

/// One game's position, owned by a single session.
pub trait Board: Send {
    /// Apply `text` for the side to move. On error the position is unchanged.
    fn apply_move(&mut self, text: &str) -> Result<(), RulesError>;

    /// Terminal result of the current position, if any.
    fn outcome(&self) -> Option<Verdict>;

    /// Side to move according to the rules.
    fn side_to_move(&self) -> Color;

    /// Position rendered for clients (FEN).
    fn render(&self) -> String;
}

pub trait RulesOracle: Send + Sync {
    fn new_game(&self) -> Box<dyn Board>;
}
