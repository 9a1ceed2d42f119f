//! Test doubles for connection outboxes and the rating actor.

use std::sync::Arc;

use actix::prelude::*;

use crate::config::game::DEFAULT_CLOCK_SECONDS;
use crate::game::chess::ChessOracle;
use crate::server::connection::ConnectionRegistry;
use crate::server::game_session::store::SessionStore;
use crate::server::matchmaking::MatchmakingQueue;
use crate::server::protocol::dispatch::ProtocolRouter;
use crate::server::protocol::messages::ServerMessage;
use crate::server::rating::GameCompleted;
use crate::server::types::{ConnectionId, Principal};

/// Stands in for a websocket actor: records every message it is sent.
#[derive(Default)]
pub struct Collector {
    received: Vec<ServerMessage>,
}

impl Actor for Collector {
    type Context = Context<Self>;
}

impl Handler<ServerMessage> for Collector {
    type Result = ();

    fn handle(&mut self, msg: ServerMessage, _ctx: &mut Context<Self>) {
        self.received.push(msg);
    }
}

/// Take everything received so far. Mailboxes are FIFO, so every message
/// enqueued before this call is included.
#[derive(Message)]
#[rtype(result = "Vec<ServerMessage>")]
pub struct Drain;

impl Handler<Drain> for Collector {
    type Result = MessageResult<Drain>;

    fn handle(&mut self, _msg: Drain, _ctx: &mut Context<Self>) -> Self::Result {
        MessageResult(std::mem::take(&mut self.received))
    }
}

pub fn collector() -> Addr<Collector> {
    Collector::default().start()
}

pub async fn drain(addr: &Addr<Collector>) -> Vec<ServerMessage> {
    addr.send(Drain).await.expect("collector mailbox closed")
}

/// Records rating requests instead of touching an account store.
#[derive(Default)]
pub struct CompletionLog {
    received: Vec<GameCompleted>,
}

impl Actor for CompletionLog {
    type Context = Context<Self>;
}

impl Handler<GameCompleted> for CompletionLog {
    type Result = ();

    fn handle(&mut self, msg: GameCompleted, _ctx: &mut Context<Self>) {
        self.received.push(msg);
    }
}

#[derive(Message)]
#[rtype(result = "Vec<GameCompleted>")]
pub struct TakeCompletions;

impl Handler<TakeCompletions> for CompletionLog {
    type Result = MessageResult<TakeCompletions>;

    fn handle(&mut self, _msg: TakeCompletions, _ctx: &mut Context<Self>) -> Self::Result {
        MessageResult(std::mem::take(&mut self.received))
    }
}

pub type Client = (ConnectionId, Addr<Collector>);

/// A router wired to in-memory collaborators. Must be built inside a running
/// actix system.
pub struct Harness {
    pub router: Arc<ProtocolRouter>,
    completions: Addr<CompletionLog>,
}

impl Harness {
    pub fn new() -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let sessions = Arc::new(SessionStore::new());
        let matchmaking =
            MatchmakingQueue::new(sessions.clone(), Arc::new(ChessOracle), DEFAULT_CLOCK_SECONDS);
        let completions = CompletionLog::default().start();
        let router = ProtocolRouter::new(
            registry,
            sessions,
            matchmaking,
            completions.clone().recipient(),
        );
        Self {
            router: Arc::new(router),
            completions,
        }
    }

    /// Register a connection the way the websocket actor does on start.
    pub fn connect(&self, user_id: &str, name: &str) -> Client {
        let outbox = collector();
        let registry = self.router.registry();
        let handle = registry.allocate();
        registry.register(handle, Principal::new(user_id, name), outbox.clone().recipient());
        (handle, outbox)
    }

    pub fn send(&self, from: ConnectionId, frame: serde_json::Value) {
        self.router.dispatch(from, &frame.to_string());
    }

    /// Connect two players and pair them. Returns the game id, White, Black,
    /// with both outboxes drained.
    pub async fn paired(&self, white: &str, black: &str) -> (String, Client, Client) {
        let w = self.connect("u1", white);
        let b = self.connect("u2", black);
        self.send(w.0, serde_json::json!({"type": "join"}));
        self.send(b.0, serde_json::json!({"type": "join"}));

        let game_id = match drain(&w.1).await.as_slice() {
            [ServerMessage::Waiting(_), ServerMessage::GameStart { game_id, .. }] => {
                game_id.to_string()
            }
            other => panic!("unexpected pairing messages: {other:?}"),
        };
        drain(&b.1).await;
        (game_id, w, b)
    }

    pub async fn completions(&self) -> Vec<GameCompleted> {
        self.completions
            .send(TakeCompletions)
            .await
            .expect("completion log closed")
    }
}
