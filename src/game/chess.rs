//! Standard chess rules backed by shakmaty.
//!
//! Moves are accepted in SAN (`e4`, `Nf3`, `Qxf7#`) or UCI (`e2e4`, `e7e8q`)
//! and positions are rendered as FEN.

use shakmaty::{
    fen::Fen, san::SanPlus, uci::UciMove, Chess, EnPassantMode, Move, Position,
};

use super::oracle::{Board, RulesError, RulesOracle};
use super::types::{Color, Method, Outcome, Verdict};

impl From<shakmaty::Color> for Color {
    fn from(color: shakmaty::Color) -> Self {
        match color {
            shakmaty::Color::White => Color::White,
            shakmaty::Color::Black => Color::Black,
        }
    }
}

/// Oracle handing out boards in the standard starting position.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChessOracle;

impl RulesOracle for ChessOracle {
    fn new_game(&self) -> Box<dyn Board> {
        Box::new(ChessBoard::new())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChessBoard {
    position: Chess,
}

impl ChessBoard {
    pub fn new() -> Self {
        Self {
            position: Chess::default(),
        }
    }

    /// Resolve `text` to a legal move in the current position.
    fn parse_move(&self, text: &str) -> Result<Move, RulesError> {
        if let Ok(uci) = text.parse::<UciMove>() {
            return uci
                .to_move(&self.position)
                .map_err(|_| RulesError::Illegal(text.to_string()));
        }
        let san: SanPlus = text
            .parse()
            .map_err(|_| RulesError::Unreadable(text.to_string()))?;
        san.san
            .to_move(&self.position)
            .map_err(|_| RulesError::Illegal(text.to_string()))
    }
}

impl Board for ChessBoard {
    fn apply_move(&mut self, text: &str) -> Result<(), RulesError> {
        if self.outcome().is_some() {
            return Err(RulesError::GameOver);
        }
        let text = text.trim();
        let m = self.parse_move(text)?;
        // `to_move` only returns legal moves.
        self.position.play_unchecked(&m);
        Ok(())
    }

    fn outcome(&self) -> Option<Verdict> {
        if self.position.is_checkmate() {
            // The side to move is mated.
            let winner = Color::from(self.position.turn()).opposite();
            Some(Verdict::new(Outcome::win_for(winner), Method::Checkmate))
        } else if self.position.is_stalemate() {
            Some(Verdict::new(Outcome::Draw, Method::Stalemate))
        } else if self.position.is_insufficient_material() {
            Some(Verdict::new(Outcome::Draw, Method::InsufficientMaterial))
        } else {
            None
        }
    }

    fn side_to_move(&self) -> Color {
        self.position.turn().into()
    }

    fn render(&self) -> String {
        Fen::from_position(self.position.clone(), EnPassantMode::Legal).to_string()
    }
}
