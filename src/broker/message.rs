use serde::{Deserialize, Serialize};

use crate::utils::codec;

/// Identifier a polling client presents on every call.
///
/// Historically this is the client's process id, but any stable integer works.
pub type ClientId = i64;

/// Free-form properties a client attaches to its `listen` call.
pub type Properties = serde_json::Map<String, serde_json::Value>;

/// What a [`Message`] means to the receiving client.
///
/// The discriminants are the wire tags and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum MessageKind {
    Registered = 0,
    Disabled = 1,
    Message = 2,
    Disconnected = 3,
    BacklogCleared = 4,
    Broadcast = 5,
    Operational = 6,
    Timeout = 7,
    Refresh = 8,
}

impl From<MessageKind> for u8 {
    fn from(kind: MessageKind) -> Self {
        kind as u8
    }
}

impl TryFrom<u8> for MessageKind {
    type Error = String;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        Ok(match tag {
            0 => Self::Registered,
            1 => Self::Disabled,
            2 => Self::Message,
            3 => Self::Disconnected,
            4 => Self::BacklogCleared,
            5 => Self::Broadcast,
            6 => Self::Operational,
            7 => Self::Timeout,
            8 => Self::Refresh,
            other => return Err(format!("unknown message kind tag {other}")),
        })
    }
}

/// A notification delivered to a polling client.
///
/// The payload is opaque to the broker. Messages are immutable once built;
/// the broker only moves them around.
///
/// On the wire the payload is base64 text:
///
/// ```json
/// { "kind": 2, "payload": "ImhlbGxvIg==" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    kind: MessageKind,
    #[serde(with = "codec::base64_bytes")]
    payload: Vec<u8>,
}

impl Message {
    pub fn new(kind: MessageKind, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }

    /// Builds a message whose payload is `text` run through the payload codec.
    pub fn text(kind: MessageKind, text: &str) -> Self {
        Self::new(kind, codec::encode_text(text))
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Decodes the payload as text. A payload that does not decode yields the
    /// decoder's error text instead.
    pub fn payload_text(&self) -> String {
        codec::decode_text(&self.payload)
    }

    pub(crate) fn disabled() -> Self {
        Self::text(MessageKind::Disabled, "Disabled")
    }

    pub(crate) fn refresh() -> Self {
        Self::text(MessageKind::Refresh, "Refresh Timer")
    }

    pub(crate) fn backlog_cleared() -> Self {
        Self::text(MessageKind::BacklogCleared, "Backlog Cleared")
    }

    pub(crate) fn disconnected() -> Self {
        Self::text(MessageKind::Disconnected, "Disconnected")
    }

    pub(crate) fn superseded() -> Self {
        Self::text(MessageKind::Timeout, "superseded by a newer listen")
    }
}

/// Emitted once per `listen`-triggered registration.
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub client_id: ClientId,
    pub properties: Properties,
}
