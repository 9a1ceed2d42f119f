//! Application state shared with HTTP and WebSocket handlers.

use std::sync::Arc;

use crate::server::auth::Authenticator;
use crate::server::protocol::ProtocolRouter;

pub struct AppState {
    /// Routes frames for every connection; also owns the registry and the
    /// session store.
    pub router: Arc<ProtocolRouter>,
    /// Checks upgrade credentials.
    pub authenticator: Arc<dyn Authenticator>,
}

impl AppState {
    pub fn new(router: Arc<ProtocolRouter>, authenticator: Arc<dyn Authenticator>) -> Self {
        AppState {
            router,
            authenticator,
        }
    }
}
