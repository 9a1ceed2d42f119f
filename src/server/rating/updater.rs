//! Elo rating updates on game completion.
//!
//! The updater is fire-and-forget from the router's point of view: a
//! `GameCompleted` is posted with `do_send` and the session has already been
//! marked completed by then. The account store is blocking, so every update
//! runs on the blocking pool.

use std::sync::Arc;

use actix::prelude::*;
use log::{info, warn};
use thiserror::Error;

use crate::accounts::{AccountStore, StoreError};
use crate::game::{Color, Verdict};
use crate::server::types::{Principal, SessionId};

#[derive(Debug, Error)]
pub enum RatingError {
    #[error("failed to load account {id}: {source}")]
    Load {
        id: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to persist account {id}: {source}")]
    Persist {
        id: String,
        #[source]
        source: StoreError,
    },

    #[error("rating task failed: {0}")]
    Task(String),
}

/// Rating change for a player scoring `score` (1, 0.5 or 0) against `opponent`.
pub fn rating_delta(player: i32, opponent: i32, score: f64, k_factor: f64) -> i32 {
    let expected = 1.0 / (1.0 + 10f64.powf(f64::from(opponent - player) / 400.0));
    (k_factor * (score - expected)).round() as i32
}

/// Posted by the router once a session reaches a verdict.
#[derive(Message, Clone, Debug)]
#[rtype(result = "()")]
pub struct GameCompleted {
    pub session_id: SessionId,
    pub white: Principal,
    pub black: Principal,
    pub verdict: Verdict,
}

pub struct RatingUpdater {
    store: Arc<dyn AccountStore>,
    k_factor: f64,
}

impl RatingUpdater {
    pub fn new(store: Arc<dyn AccountStore>, k_factor: f64) -> Self {
        Self { store, k_factor }
    }
}

impl Actor for RatingUpdater {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        info!("[Rating] Updater started (K={})", self.k_factor);
    }
}

/// Load both accounts, then persist both new ratings. Deltas are computed from
/// the ratings as they were before this game.
fn apply(
    store: &dyn AccountStore,
    k_factor: f64,
    game: &GameCompleted,
) -> Result<(i32, i32), RatingError> {
    let load = |p: &Principal| {
        store.get_by_id(&p.id).map_err(|source| RatingError::Load {
            id: p.id.clone(),
            source,
        })
    };
    let mut white = load(&game.white)?;
    let mut black = load(&game.black)?;

    let outcome = game.verdict.outcome;
    let white_delta = rating_delta(
        white.rating,
        black.rating,
        outcome.score_for(Color::White),
        k_factor,
    );
    let black_delta = rating_delta(
        black.rating,
        white.rating,
        outcome.score_for(Color::Black),
        k_factor,
    );
    white.rating += white_delta;
    black.rating += black_delta;

    for account in [&white, &black] {
        store.update(account).map_err(|source| RatingError::Persist {
            id: account.id.clone(),
            source,
        })?;
    }
    Ok((white_delta, black_delta))
}

impl Handler<GameCompleted> for RatingUpdater {
    type Result = ResponseFuture<()>;

    fn handle(&mut self, msg: GameCompleted, _ctx: &mut Context<Self>) -> Self::Result {
        let store = self.store.clone();
        let k_factor = self.k_factor;
        Box::pin(async move {
            let session_id = msg.session_id;
            let result = tokio::task::spawn_blocking(move || apply(store.as_ref(), k_factor, &msg))
                .await
                .map_err(|e| RatingError::Task(e.to_string()))
                .and_then(|r| r);
            match result {
                Ok((white_delta, black_delta)) => info!(
                    "[Rating] game_id={} white {:+} black {:+}",
                    session_id, white_delta, black_delta
                ),
                Err(e) => warn!("[Rating] game_id={} not rated: {}", session_id, e),
            }
        })
    }
}
