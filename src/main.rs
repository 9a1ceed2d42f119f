//! Main entry point for the chess relay.
//!
//! Loads configuration, wires the registry, session store, matchmaking queue
//! and rating actor together, and launches the HTTP server with the `/ws` and
//! `/health` endpoints.

use std::sync::Arc;
use std::time::Duration;

use actix::Actor;
use actix_web::{App, HttpServer, web};
use log::{error, info};

use accounts::{Account, InMemoryAccountStore};
use config::game::{
    COMPLETED_SESSION_RETENTION_SECS, DEFAULT_CLOCK_SECONDS, ELO_K_FACTOR, REAPER_INTERVAL_SECS,
};
use config::server::{ServerConfig, TokenGrant};
use game::chess::ChessOracle;
use server::auth::StaticTokenAuthenticator;
use server::connection::ConnectionRegistry;
use server::game_session::SessionStore;
use server::game_session::reaper::SessionReaper;
use server::matchmaking::MatchmakingQueue;
use server::protocol::ProtocolRouter;
use server::rating::RatingUpdater;

mod accounts;
pub mod config;
mod game;
mod server;

/// Every configured principal gets an account so its games can be rated.
fn seed_accounts(grants: &[TokenGrant]) -> InMemoryAccountStore {
    let store = InMemoryAccountStore::new();
    for grant in grants {
        store.insert(Account::new(&grant.user_id, &grant.display_name, ""));
    }
    store
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Log level comes from RUST_LOG.
    env_logger::init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("[Main] Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    let authenticator = Arc::new(StaticTokenAuthenticator::new(&config.tokens));
    if authenticator.is_empty() {
        info!("[Main] No tokens configured; every upgrade will be rejected");
    } else {
        info!("[Main] Loaded {} token(s)", authenticator.len());
    }

    let registry = Arc::new(ConnectionRegistry::new());
    let sessions = Arc::new(SessionStore::new());
    let matchmaking = MatchmakingQueue::new(
        sessions.clone(),
        Arc::new(ChessOracle),
        DEFAULT_CLOCK_SECONDS,
    );

    let accounts = Arc::new(seed_accounts(&config.tokens));
    let ratings = RatingUpdater::new(accounts, ELO_K_FACTOR).start();

    SessionReaper::new(
        sessions.clone(),
        registry.clone(),
        Duration::from_secs(REAPER_INTERVAL_SECS),
        Duration::from_secs(COMPLETED_SESSION_RETENTION_SECS),
    )
    .start();

    let router = Arc::new(ProtocolRouter::new(
        registry,
        sessions,
        matchmaking,
        ratings.recipient(),
    ));
    let state = web::Data::new(server::state::AppState::new(router, authenticator));

    info!("[Main] Listening on {}", config.bind_address);
    let allowed_origins = config.allowed_origins.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(
                actix_web::middleware::DefaultHeaders::new()
                    .add(("Access-Control-Allow-Origin", allowed_origins.as_str()))
                    .add(("Access-Control-Allow-Headers", "*")),
            )
            .app_data(state.clone())
            .configure(server::router::config)
    })
    .bind(config.bind_address.as_str())?
    .run()
    .await
}
