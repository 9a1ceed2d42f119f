use crate::game::Color;
use crate::server::types::{ConnectionId, Principal, SessionId};

/// The single principal waiting for an opponent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WaitingEntry {
    pub principal: Principal,
    pub connection: ConnectionId,
}

/// A session created by a `join`, as seen by the arriving player.
#[derive(Clone, Debug, PartialEq)]
pub struct Pairing {
    pub session_id: SessionId,
    /// Color of the arriving player (always Black).
    pub color: Color,
    pub opponent: Principal,
    pub opponent_connection: ConnectionId,
}

#[derive(Clone, Debug, PartialEq)]
pub enum JoinOutcome {
    Waiting,
    Paired(Pairing),
}
