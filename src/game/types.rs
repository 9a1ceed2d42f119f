use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn opposite(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Color::White => "white",
            Color::Black => "black",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final result of a game, seen from the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    WhiteWon,
    BlackWon,
    Draw,
}

impl Outcome {
    /// The outcome in which `color` is the winner.
    pub fn win_for(color: Color) -> Self {
        match color {
            Color::White => Outcome::WhiteWon,
            Color::Black => Outcome::BlackWon,
        }
    }

    pub fn winner(self) -> Option<Color> {
        match self {
            Outcome::WhiteWon => Some(Color::White),
            Outcome::BlackWon => Some(Color::Black),
            Outcome::Draw => None,
        }
    }

    /// Actual score for `color`: 1.0 win, 0.5 draw, 0.0 loss.
    pub fn score_for(self, color: Color) -> f64 {
        match self.winner() {
            Some(winner) if winner == color => 1.0,
            Some(_) => 0.0,
            None => 0.5,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Outcome::WhiteWon => "white won",
            Outcome::BlackWon => "black won",
            Outcome::Draw => "draw",
        })
    }
}

/// How a game reached its outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Checkmate,
    Stalemate,
    InsufficientMaterial,
    Resignation,
    Agreement,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Checkmate => "checkmate",
            Method::Stalemate => "stalemate",
            Method::InsufficientMaterial => "insufficient material",
            Method::Resignation => "resignation",
            Method::Agreement => "agreement",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub outcome: Outcome,
    pub method: Method,
}

impl Verdict {
    pub fn new(outcome: Outcome, method: Method) -> Self {
        Self { outcome, method }
    }

    /// `"white"`, `"black"` or `"draw"`, as sent in `gameOver`.
    pub fn winner_label(&self) -> &'static str {
        self.outcome.winner().map_or("draw", Color::as_str)
    }
}
