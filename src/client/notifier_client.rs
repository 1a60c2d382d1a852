//! Long-poll client
//!
//! `NotifierClient` speaks the request/reply protocol of
//! [`crate::transport`]. Calls are made one at a time on the connection, so
//! while `listen` waits nothing else is sent; use a second client for
//! administrative calls.

use std::ops::ControlFlow;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info};
use tungstenite::protocol::Message as WsMessage;

use crate::broker::{ClientId, Message, MessageKind, Properties};
use crate::transport::{Reply, ReplyFrame, Request, RequestFrame};
use crate::utils::error::{ClientError, TransportError};

/// The identifier this process uses when none is given: its process id.
pub fn default_client_id() -> ClientId {
    ClientId::from(std::process::id())
}

/// One-line human description of a received message.
pub fn describe(message: &Message) -> String {
    let text = message.payload_text();
    match message.kind() {
        MessageKind::Message => format!("Message received: {text}"),
        MessageKind::Timeout => format!("Timeout received: {text}"),
        MessageKind::Broadcast => format!("Broadcast message received: {text}"),
        MessageKind::Refresh => format!("Refresh timer received: {text}"),
        _ => format!("Notification received: {text}"),
    }
}

#[derive(Debug)]
pub struct NotifierClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    next_request_id: u64,
}

impl NotifierClient {
    pub async fn connect(url: &str) -> Result<Self, ClientError> {
        let (stream, _response) = connect_async(url).await?;
        debug!(url, "connected");
        Ok(Self {
            stream,
            next_request_id: 0,
        })
    }

    /// Long-polls for the next message for `client_id`.
    pub async fn listen(
        &mut self,
        client_id: ClientId,
        properties: Properties,
    ) -> Result<Message, ClientError> {
        self.call_for_message(Request::Listen {
            client_id,
            properties,
        })
        .await
    }

    pub async fn send(&mut self, client_id: ClientId, message: Message) -> Result<(), ClientError> {
        self.call_for_ack(Request::Send { client_id, message }).await
    }

    pub async fn send_to_many(
        &mut self,
        client_ids: Vec<ClientId>,
        message: Message,
    ) -> Result<(), ClientError> {
        self.call_for_ack(Request::SendToMany {
            client_ids,
            message,
        })
        .await
    }

    pub async fn broadcast(&mut self, message: Message) -> Result<(), ClientError> {
        self.call_for_ack(Request::Broadcast { message }).await
    }

    pub async fn clear_backlog(&mut self, client_id: ClientId) -> Result<Message, ClientError> {
        self.call_for_message(Request::ClearBacklog { client_id })
            .await
    }

    pub async fn disconnect(&mut self, client_id: ClientId) -> Result<Message, ClientError> {
        self.call_for_message(Request::Disconnect { client_id }).await
    }

    pub async fn enable(&mut self) -> Result<(), ClientError> {
        self.call_for_ack(Request::Enable).await
    }

    pub async fn disable(&mut self) -> Result<(), ClientError> {
        self.call_for_ack(Request::Disable).await
    }

    /// Polls forever, handing every message to `handler`.
    ///
    /// A `Disabled` reply is not passed on; the loop waits `disabled_retry`
    /// and polls again. Returns when `handler` breaks or the transport fails.
    pub async fn listen_loop<F>(
        &mut self,
        client_id: ClientId,
        properties: Properties,
        disabled_retry: Duration,
        mut handler: F,
    ) -> Result<(), ClientError>
    where
        F: FnMut(&Message) -> ControlFlow<()>,
    {
        loop {
            let message = self.listen(client_id, properties.clone()).await?;

            if message.kind() == MessageKind::Disabled {
                info!(
                    retry_in = ?disabled_retry,
                    "Server currently disabled, will try again"
                );
                tokio::time::sleep(disabled_retry).await;
                continue;
            }

            if handler(&message).is_break() {
                return Ok(());
            }
        }
    }

    pub async fn close(mut self) -> Result<(), ClientError> {
        self.stream.close(None).await?;
        Ok(())
    }

    async fn call_for_message(&mut self, request: Request) -> Result<Message, ClientError> {
        let name = request.name();
        match self.call(request).await? {
            Reply::Message { message } => Ok(message),
            other => Err(ClientError::UnexpectedReply {
                request: name,
                reply: format!("{other:?}"),
            }),
        }
    }

    async fn call_for_ack(&mut self, request: Request) -> Result<(), ClientError> {
        let name = request.name();
        match self.call(request).await? {
            Reply::Ack => Ok(()),
            other => Err(ClientError::UnexpectedReply {
                request: name,
                reply: format!("{other:?}"),
            }),
        }
    }

    async fn call(&mut self, request: Request) -> Result<Reply, ClientError> {
        self.next_request_id += 1;
        let request_id = self.next_request_id;

        let frame = RequestFrame {
            request_id: Some(request_id),
            request,
        };
        self.stream
            .send(WsMessage::text(serde_json::to_string(&frame)?))
            .await?;

        while let Some(msg) = self.stream.next().await {
            let text = match msg? {
                WsMessage::Text(text) => text,
                WsMessage::Close(_) => break,
                _ => continue,
            };

            let reply: ReplyFrame = serde_json::from_str(text.as_str())?;
            match (reply.request_id, reply.reply) {
                (Some(id), reply) if id == request_id => {
                    return match reply {
                        Reply::Error { message } => Err(ClientError::Rejected(message)),
                        reply => Ok(reply),
                    };
                }
                (None, Reply::Error { message }) => return Err(ClientError::Rejected(message)),
                (id, _) => debug!(?id, expected = request_id, "ignoring stale reply"),
            }
        }

        Err(TransportError::Closed.into())
    }
}
