/// Periodic eviction of completed sessions.
///
/// Completed sessions stay readable for reconnect snapshots during the
/// retention window, then are dropped, and connections forget them. Active
/// sessions are never touched.
use std::sync::Arc;
use std::time::{Duration, Instant};

use actix::prelude::*;
use log::info;

use super::store::SessionStore;
use crate::server::connection::ConnectionRegistry;

pub struct SessionReaper {
    sessions: Arc<SessionStore>,
    registry: Arc<ConnectionRegistry>,
    interval: Duration,
    retention: Duration,
}

impl SessionReaper {
    pub fn new(
        sessions: Arc<SessionStore>,
        registry: Arc<ConnectionRegistry>,
        interval: Duration,
        retention: Duration,
    ) -> Self {
        Self {
            sessions,
            registry,
            interval,
            retention,
        }
    }

    fn sweep(&self) -> usize {
        let evicted = self.sessions.reap_completed(self.retention, Instant::now());
        if !evicted.is_empty() {
            self.registry.forget_sessions(&evicted);
            info!(
                "[Reaper] Evicted {} completed session(s), {} remaining",
                evicted.len(),
                self.sessions.len()
            );
        }
        evicted.len()
    }
}

impl Actor for SessionReaper {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        ctx.run_interval(self.interval, |_act, ctx| ctx.notify(Sweep));
    }
}

/// Message: run a sweep. Returns the number of evicted sessions.
#[derive(Message)]
#[rtype(result = "usize")]
pub struct Sweep;

impl Handler<Sweep> for SessionReaper {
    type Result = usize;

    fn handle(&mut self, _msg: Sweep, _ctx: &mut Context<Self>) -> Self::Result {
        self.sweep()
    }
}
