//! Rating module: Elo updates applied after a session completes.

pub mod updater;

pub use updater::{GameCompleted, RatingUpdater};
