//! Live connections and the principal bound to each.
//!
//! The registry is the only owner of a connection's outbox. Everything else
//! (sessions, the waiting slot) keeps a `ConnectionId` and looks the outbox up
//! here when it needs to deliver something, so a closed connection simply
//! stops resolving.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use actix::Recipient;
use dashmap::DashMap;
use log::{debug, warn};

use crate::server::protocol::messages::ServerMessage;
use crate::server::types::{ConnectionId, Principal, SessionId};

/// Mailbox of the websocket actor serving one connection. It is the single
/// writer to that socket.
pub type Outbox = Recipient<ServerMessage>;

pub struct ConnectionEntry {
    pub principal: Principal,
    outbox: Outbox,
    /// Sessions this connection was bound to, for teardown.
    sessions: HashSet<SessionId>,
}

impl ConnectionEntry {
    pub fn sessions(&self) -> impl Iterator<Item = &SessionId> {
        self.sessions.iter()
    }
}

#[derive(Default)]
pub struct ConnectionRegistry {
    next_id: AtomicU64,
    connections: DashMap<ConnectionId, ConnectionEntry>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out a fresh, never reused handle.
    pub fn allocate(&self) -> ConnectionId {
        ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    pub fn register(&self, handle: ConnectionId, principal: Principal, outbox: Outbox) {
        debug!(
            "[Registry] {} registered for user={} ({})",
            handle, principal.display_name, principal.id
        );
        self.connections.insert(
            handle,
            ConnectionEntry {
                principal,
                outbox,
                sessions: HashSet::new(),
            },
        );
    }

    /// Remove the mapping and hand back what was stored. No session state is
    /// touched here.
    pub fn unregister(&self, handle: ConnectionId) -> Option<ConnectionEntry> {
        let removed = self.connections.remove(&handle).map(|(_, entry)| entry);
        if removed.is_some() {
            debug!("[Registry] {} unregistered", handle);
        }
        removed
    }

    pub fn principal_of(&self, handle: ConnectionId) -> Option<Principal> {
        self.connections
            .get(&handle)
            .map(|entry| entry.principal.clone())
    }

    pub fn is_registered(&self, handle: ConnectionId) -> bool {
        self.connections.contains_key(&handle)
    }

    /// Remember that `handle` is seated in `session` so teardown can unbind it.
    pub fn note_binding(&self, handle: ConnectionId, session: SessionId) {
        if let Some(mut entry) = self.connections.get_mut(&handle) {
            entry.sessions.insert(session);
        }
    }

    /// Drop evicted sessions from every connection's binding notes.
    pub fn forget_sessions(&self, evicted: &[SessionId]) {
        for mut entry in self.connections.iter_mut() {
            for id in evicted {
                entry.sessions.remove(id);
            }
        }
    }

    /// Enqueue `msg` on the outbox of `handle`. Returns false when the
    /// connection is gone.
    pub fn send(&self, handle: ConnectionId, msg: ServerMessage) -> bool {
        match self.connections.get(&handle) {
            Some(entry) => {
                entry.outbox.do_send(msg);
                true
            }
            None => {
                warn!("[Registry] Dropped message for closed connection {}", handle);
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::testing::{collector, drain};
    use std::sync::Arc;
    use std::thread;

    #[actix::test]
    async fn register_send_unregister() {
        let registry = ConnectionRegistry::new();
        let sink = collector();
        let handle = registry.allocate();
        registry.register(handle, Principal::new("u1", "alice"), sink.clone().recipient());

        assert_eq!(
            registry.principal_of(handle),
            Some(Principal::new("u1", "alice"))
        );
        assert!(registry.send(handle, ServerMessage::Pong));

        let session = SessionId::new();
        registry.note_binding(handle, session);
        let entry = registry.unregister(handle).unwrap();
        assert_eq!(entry.sessions().copied().collect::<Vec<_>>(), vec![session]);

        assert!(registry.principal_of(handle).is_none());
        assert!(!registry.send(handle, ServerMessage::Pong));
        assert_eq!(drain(&sink).await, vec![ServerMessage::Pong]);
    }

    #[actix::test]
    async fn forgetting_sessions_leaves_other_bindings() {
        let registry = ConnectionRegistry::new();
        let handle = registry.allocate();
        registry.register(handle, Principal::new("u1", "alice"), collector().recipient());
        let (gone, kept) = (SessionId::new(), SessionId::new());
        registry.note_binding(handle, gone);
        registry.note_binding(handle, kept);

        registry.forget_sessions(&[gone]);
        let entry = registry.unregister(handle).unwrap();
        assert_eq!(entry.sessions().copied().collect::<Vec<_>>(), vec![kept]);
    }

    #[actix::test]
    async fn concurrent_register_and_unregister() {
        let registry = Arc::new(ConnectionRegistry::new());
        let outbox: Outbox = collector().recipient();

        let workers: Vec<_> = (0..8)
            .map(|w| {
                let registry = registry.clone();
                let outbox = outbox.clone();
                thread::spawn(move || {
                    let mut kept = Vec::new();
                    for i in 0..100 {
                        let handle = registry.allocate();
                        registry.register(
                            handle,
                            Principal::new(format!("u{w}-{i}"), format!("p{w}-{i}")),
                            outbox.clone(),
                        );
                        if i % 2 == 0 {
                            assert!(registry.unregister(handle).is_some());
                        } else {
                            kept.push(handle);
                        }
                    }
                    kept
                })
            })
            .collect();

        let kept: Vec<ConnectionId> = workers
            .into_iter()
            .flat_map(|w| w.join().unwrap())
            .collect();
        assert_eq!(registry.len(), 400);
        assert!(kept.iter().all(|h| registry.is_registered(*h)));
    }
}
