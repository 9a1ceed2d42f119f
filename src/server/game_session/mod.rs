//! Game sessions: the per-match state machine, the store that owns them, and
//! the reaper that evicts finished ones.

pub mod reaper;
pub mod session;
pub mod store;

pub use session::GameSession;
pub use store::SessionStore;
