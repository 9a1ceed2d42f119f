/// Error types surfaced to clients, and helpers for HTTP error responses.
///
/// Every `GameError` reaches the client as `error{message}` on the sender's
/// socket only; none of them mutates session state.
use actix_web::{HttpResponse, http::StatusCode};
use thiserror::Error;

use crate::game::RulesError;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GameError {
    // Routing errors.
    #[error("game not found")]
    GameNotFound,

    #[error("player not in this game")]
    PlayerNotInSession,

    #[error("connection is not authenticated")]
    NotAuthenticated,

    // Domain errors.
    #[error("not your turn")]
    NotYourTurn,

    #[error("invalid move: {0}")]
    InvalidMove(String),

    #[error("no draw was offered")]
    NoDrawPending,

    #[error("game is not active")]
    GameNotActive,
}

impl From<RulesError> for GameError {
    fn from(err: RulesError) -> Self {
        match err {
            RulesError::GameOver => GameError::GameNotActive,
            other => GameError::InvalidMove(other.to_string()),
        }
    }
}

/// Returns an HTTP error response with a JSON body.
///
/// # Arguments
/// - `code`: Unique error code (e.g. "UNAUTHORIZED").
/// - `message`: Human-readable error message.
/// - `status`: HTTP status code.
pub fn http_error_response(code: &str, message: &str, status: StatusCode) -> HttpResponse {
    HttpResponse::build(status).json(serde_json::json!({
        "error": { "code": code, "message": message }
    }))
}
