//! Server layer root module.
//!
//! - Connection registry and the websocket actor per connection
//! - Matchmaking (single waiting slot)
//! - Game sessions, their store and the reaper
//! - Protocol codec and router
//! - Rating updates, authentication, HTTP routing

pub mod auth;
pub mod connection;
pub mod game_session;
pub mod matchmaking;
pub mod protocol;
pub mod rating;
pub mod router;
pub mod state;
pub mod types;
pub mod ws_error;

#[cfg(test)]
pub mod testing;
