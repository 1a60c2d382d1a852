//! The `error` module defines the error types used by the `pollnotify`
//! transport and client.
//!
//! The broker core itself has no error paths: every `listen` resolves to a
//! well-formed message. Errors only exist at the wire.

use thiserror::Error;

/// Failures of the WebSocket transport, on either side of the connection.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("invalid frame: {0}")]
    Json(#[from] serde_json::Error),

    #[error("connection closed")]
    Closed,
}

/// Failures a [`crate::client::NotifierClient`] can report to its caller.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("server rejected request: {0}")]
    Rejected(String),

    #[error("unexpected reply to {request}: {reply}")]
    UnexpectedReply { request: &'static str, reply: String },
}

impl From<tungstenite::Error> for ClientError {
    fn from(e: tungstenite::Error) -> Self {
        Self::Transport(TransportError::WebSocket(e))
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        Self::Transport(TransportError::Json(e))
    }
}

/// A producer configuration that cannot be turned into a running producer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProducerError {
    #[error("invalid target {0:?}: expected \"broadcast\" or a comma separated list of client ids")]
    InvalidTarget(String),

    #[error("invalid random interval: min {min}ms must be below max {max}ms")]
    InvalidInterval { min: u64, max: u64 },
}
