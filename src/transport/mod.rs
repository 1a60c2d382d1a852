//! The `transport` module is responsible for carrying broker calls over the
//! network, via WebSockets.
//!
//! It defines the JSON request/reply frames exchanged with clients and
//! implements the WebSocket server that decodes requests, runs them against
//! the broker and writes the replies back.

pub mod message;
pub mod websocket;

pub use message::{Reply, ReplyFrame, Request, RequestFrame};
pub use websocket::{bind, dispatch, serve, start_websocket_server};

#[cfg(test)]
mod tests;
