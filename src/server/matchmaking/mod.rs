//! Matchmaking module: the single waiting slot and session creation.

pub mod queue;
pub mod types;

pub use queue::MatchmakingQueue;
