use serde::{Deserialize, Serialize};

use crate::broker::{ClientId, Message, Properties};

/// A call a client makes on the broker.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    Listen {
        client_id: ClientId,
        #[serde(default)]
        properties: Properties,
    },
    Send {
        client_id: ClientId,
        message: Message,
    },
    Broadcast {
        message: Message,
    },
    SendToMany {
        client_ids: Vec<ClientId>,
        message: Message,
    },
    ClearBacklog {
        client_id: ClientId,
    },
    Disconnect {
        client_id: ClientId,
    },
    Enable,
    Disable,
}

impl Request {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Listen { .. } => "listen",
            Self::Send { .. } => "send",
            Self::Broadcast { .. } => "broadcast",
            Self::SendToMany { .. } => "send_to_many",
            Self::ClearBacklog { .. } => "clear_backlog",
            Self::Disconnect { .. } => "disconnect",
            Self::Enable => "enable",
            Self::Disable => "disable",
        }
    }
}

/// The broker's answer to a [`Request`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reply {
    Message { message: Message },
    Ack,
    Error { message: String },
}

/// A request as it travels over the socket.
///
/// `request_id` is optional and echoed verbatim in the reply, so a client may
/// keep several calls in flight on one connection.
///
/// ```json
/// { "request_id": 1, "type": "listen", "client_id": 4242, "properties": {} }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RequestFrame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<u64>,
    #[serde(flatten)]
    pub request: Request,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ReplyFrame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<u64>,
    #[serde(flatten)]
    pub reply: Reply,
}
