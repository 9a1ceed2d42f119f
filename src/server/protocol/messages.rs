//! Wire format: every frame is an envelope `{"type": ..., "payload": {...}}`.
//!
//! Inbound envelopes are decoded into one concrete [`ClientMessage`] variant
//! per `type`, with the payload validated before dispatch. Outbound messages
//! are [`ServerMessage`] values, which double as the actix message delivered
//! to a connection's outbox.

use actix::prelude::*;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::game::{Color, Verdict};
use crate::server::game_session::session::Snapshot;
use crate::server::types::SessionId;
use crate::server::ws_error::GameError;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unknown message type '{0}'")]
    UnknownType(String),

    #[error("invalid payload for '{kind}': {source}")]
    InvalidPayload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Client -> server intents.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    Join,
    Move { game_id: String, mv: String },
    Resign { game_id: String },
    DrawOffer { game_id: String },
    DrawResponse { game_id: String, accept: bool },
    TimeUpdate { game_id: String, time_left: f64 },
    Chat { game_id: String, message: String },
    Reconnect { game_id: String },
    Ping,
}

impl ClientMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::Join => "join",
            ClientMessage::Move { .. } => "move",
            ClientMessage::Resign { .. } => "resign",
            ClientMessage::DrawOffer { .. } => "draw_offer",
            ClientMessage::DrawResponse { .. } => "draw_response",
            ClientMessage::TimeUpdate { .. } => "time_update",
            ClientMessage::Chat { .. } => "chat",
            ClientMessage::Reconnect { .. } => "reconnect",
            ClientMessage::Ping => "ping",
        }
    }
}

#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GamePayload {
    game_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MovePayload {
    game_id: String,
    #[serde(rename = "move")]
    mv: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DrawResponsePayload {
    game_id: String,
    accept: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimeUpdatePayload {
    game_id: String,
    time_left: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatPayload {
    game_id: String,
    message: String,
}

fn payload_of<T: DeserializeOwned>(kind: &str, payload: Value) -> Result<T, DecodeError> {
    serde_json::from_value(payload).map_err(|source| DecodeError::InvalidPayload {
        kind: kind.to_string(),
        source,
    })
}

/// Decode one text frame.
pub fn decode(text: &str) -> Result<ClientMessage, DecodeError> {
    let RawEnvelope { kind, payload } = serde_json::from_str(text)?;
    let msg = match kind.as_str() {
        "join" => ClientMessage::Join,
        "ping" => ClientMessage::Ping,
        "move" => {
            let p: MovePayload = payload_of(&kind, payload)?;
            ClientMessage::Move {
                game_id: p.game_id,
                mv: p.mv,
            }
        }
        "resign" => {
            let p: GamePayload = payload_of(&kind, payload)?;
            ClientMessage::Resign { game_id: p.game_id }
        }
        "draw_offer" => {
            let p: GamePayload = payload_of(&kind, payload)?;
            ClientMessage::DrawOffer { game_id: p.game_id }
        }
        "draw_response" => {
            let p: DrawResponsePayload = payload_of(&kind, payload)?;
            ClientMessage::DrawResponse {
                game_id: p.game_id,
                accept: p.accept,
            }
        }
        "time_update" => {
            let p: TimeUpdatePayload = payload_of(&kind, payload)?;
            ClientMessage::TimeUpdate {
                game_id: p.game_id,
                time_left: p.time_left,
            }
        }
        "chat" => {
            let p: ChatPayload = payload_of(&kind, payload)?;
            ClientMessage::Chat {
                game_id: p.game_id,
                message: p.message,
            }
        }
        "reconnect" => {
            let p: GamePayload = payload_of(&kind, payload)?;
            ClientMessage::Reconnect { game_id: p.game_id }
        }
        _ => return Err(DecodeError::UnknownType(kind)),
    };
    Ok(msg)
}

/// Server -> client messages. Sending one to a connection's recipient
/// enqueues it on that connection's outbox.
#[derive(Message, Serialize, Clone, Debug, PartialEq)]
#[rtype(result = "()")]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum ServerMessage {
    Waiting(String),
    #[serde(rename_all = "camelCase")]
    GameStart {
        game_id: SessionId,
        color: Color,
        opponent: String,
    },
    Move {
        #[serde(rename = "move")]
        mv: String,
        position: String,
        turn: Color,
    },
    GameOver {
        outcome: String,
        method: String,
        winner: String,
    },
    #[serde(rename_all = "camelCase")]
    DrawOffer { offered_by: Color },
    DrawResponse { accepted: bool },
    #[serde(rename_all = "camelCase")]
    TimeUpdate { color: Color, time_left: f64 },
    Chat { sender: String, message: String },
    #[serde(rename_all = "camelCase")]
    GameState {
        position: String,
        turn: Color,
        white_player: String,
        black_player: String,
        white_time: f64,
        black_time: f64,
    },
    Error { message: String },
    Pong,
}

impl ServerMessage {
    pub fn waiting() -> Self {
        Self::Waiting("Waiting for opponent...".to_string())
    }

    pub fn error(err: &GameError) -> Self {
        Self::Error {
            message: err.to_string(),
        }
    }

    pub fn game_over(verdict: &Verdict) -> Self {
        Self::GameOver {
            outcome: verdict.outcome.to_string(),
            method: verdict.method.to_string(),
            winner: verdict.winner_label().to_string(),
        }
    }

    pub fn game_state(snapshot: Snapshot) -> Self {
        Self::GameState {
            position: snapshot.position,
            turn: snapshot.turn,
            white_player: snapshot.white_name,
            black_player: snapshot.black_name,
            white_time: snapshot.white_seconds,
            black_time: snapshot.black_seconds,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
