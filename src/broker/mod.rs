//! The `broker` module is the heart of `pollnotify`: the client registry,
//! the long-poll delivery state machine and the keepalive refresh timers.

pub mod engine;
pub mod message;
pub mod refresh;
pub mod registry;

pub use engine::Broker;
pub use message::{ClientId, Message, MessageKind, Properties, Registration};
pub use registry::Delivery;
