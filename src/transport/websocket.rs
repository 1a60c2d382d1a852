//! WebSocket transport
//!
//! This file implements the WebSocket server that exposes the broker.
//! Responsibilities:
//! - Accept TCP/WebSocket connections, one task per connection
//! - Decode JSON request frames and run each one against the `Broker` in its
//!   own task, so a parked `listen` never blocks other calls on the socket
//! - Write reply frames back through a single writer task
//! - Abort outstanding calls when the connection goes away. Once aborted, a
//!   poll no longer accepts direct delivery and later sends go to the backlog;
//!   a send that lands before the abort is delivered at most once and may be
//!   lost with the connection

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::spawn;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_tungstenite::accept_async;
use tracing::{debug, error, info, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::broker::Broker;
use crate::transport::message::{Reply, ReplyFrame, Request, RequestFrame};
use crate::utils::error::TransportError;

/// Binds `addr` and serves the broker on it until the process ends.
///
/// A bind failure is returned to the caller; it is fatal for the server.
pub async fn start_websocket_server(addr: &str, broker: Broker) -> Result<(), TransportError> {
    let listener = bind(addr).await?;
    serve(listener, broker).await;
    Ok(())
}

pub async fn bind(addr: &str) -> Result<TcpListener, TransportError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| TransportError::Bind {
            addr: addr.to_string(),
            source,
        })
}

/// Accepts connections on `listener` forever.
pub async fn serve(listener: TcpListener, broker: Broker) {
    match listener.local_addr() {
        Ok(addr) => info!("WebSocket server listening on ws://{addr}"),
        Err(e) => warn!(error = %e, "WebSocket server listening on unknown address"),
    }

    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                spawn(handle_connection(stream, peer, broker.clone()));
            }
            Err(e) => {
                warn!(error = %e, "failed to accept connection");
            }
        }
    }
}

/// Runs one request against the broker.
///
/// `listen` may wait for a long time; everything else answers immediately.
pub async fn dispatch(broker: &Broker, request: Request) -> Reply {
    match request {
        Request::Listen {
            client_id,
            properties,
        } => Reply::Message {
            message: broker.listen(client_id, properties).await,
        },
        Request::Send { client_id, message } => {
            broker.send(client_id, message);
            Reply::Ack
        }
        Request::Broadcast { message } => {
            broker.broadcast(message);
            Reply::Ack
        }
        Request::SendToMany {
            client_ids,
            message,
        } => {
            broker.send_to_many(&client_ids, message);
            Reply::Ack
        }
        Request::ClearBacklog { client_id } => Reply::Message {
            message: broker.clear_backlog(client_id),
        },
        Request::Disconnect { client_id } => Reply::Message {
            message: broker.disconnect(client_id),
        },
        Request::Enable => {
            broker.enable();
            Reply::Ack
        }
        Request::Disable => {
            broker.disable();
            Reply::Ack
        }
    }
}

async fn handle_connection(stream: TcpStream, peer: SocketAddr, broker: Broker) {
    let connection_id = format!("conn-{}", uuid::Uuid::new_v4());

    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!(%peer, error = %e, "WebSocket handshake error");
            return;
        }
    };
    info!(%connection_id, %peer, "connection opened");

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();

    let writer = {
        let connection_id = connection_id.clone();
        spawn(async move {
            while let Some(msg) = rx.recv().await {
                if let Err(e) = ws_sender.send(msg).await {
                    debug!(%connection_id, error = %e, "failed to write reply");
                    break;
                }
            }
            debug!(%connection_id, "send loop closed");
        })
    };

    let mut in_flight = JoinSet::new();

    while let Some(frame) = ws_receiver.next().await {
        let msg = match frame {
            Ok(msg) => msg,
            Err(e) => {
                debug!(%connection_id, error = %e, "read error");
                break;
            }
        };

        match msg {
            WsMessage::Text(text) => match serde_json::from_str::<RequestFrame>(text.as_str()) {
                Ok(RequestFrame {
                    request_id,
                    request,
                }) => {
                    debug!(%connection_id, request = request.name(), ?request_id, "request received");
                    let broker = broker.clone();
                    let tx = tx.clone();
                    in_flight.spawn(async move {
                        let reply = dispatch(&broker, request).await;
                        send_reply(&tx, ReplyFrame { request_id, reply });
                    });
                }
                Err(err) => {
                    warn!(
                        %connection_id,
                        error = %err,
                        frame = %text.chars().take(100).collect::<String>(),
                        "invalid request frame"
                    );
                    send_reply(
                        &tx,
                        ReplyFrame {
                            request_id: None,
                            reply: Reply::Error {
                                message: err.to_string(),
                            },
                        },
                    );
                }
            },
            WsMessage::Close(_) => break,
            _ => {}
        }

        while in_flight.try_join_next().is_some() {}
    }

    // Sends arriving after this go to the backlog. One that already reached a
    // parked poll is lost with the connection.
    in_flight.shutdown().await;
    drop(tx);
    let _ = writer.await;

    info!(%connection_id, "connection closed");
}

fn send_reply(tx: &mpsc::UnboundedSender<WsMessage>, frame: ReplyFrame) {
    match serde_json::to_string(&frame) {
        Ok(json) => {
            // The writer is gone only when the connection is closing.
            let _ = tx.send(WsMessage::text(json));
        }
        Err(e) => error!(error = %e, "failed to serialize reply"),
    }
}
