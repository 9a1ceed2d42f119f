//! Connection layer: the registry of live sockets and the websocket actor
//! serving each of them.

pub mod registry;
pub mod session;

pub use registry::ConnectionRegistry;
