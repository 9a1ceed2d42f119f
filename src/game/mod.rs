//! Chess-side vocabulary and the rules collaborator.
//!
//! `oracle` is the seam the session state machine depends on; `chess` is the
//! shakmaty-backed implementation wired in at startup.

pub mod chess;
pub mod oracle;
pub mod types;

pub use oracle::{Board, RulesError, RulesOracle};
pub use types::{Color, Method, Outcome, Verdict};
