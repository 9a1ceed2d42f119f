//! Wire protocol: envelope codec and the router applying decoded intents.

pub mod dispatch;
pub mod messages;

pub use dispatch::ProtocolRouter;
