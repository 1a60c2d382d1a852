use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio_tungstenite::connect_async;
use tungstenite::protocol::Message as WsMessage;

use super::{Reply, ReplyFrame, Request, RequestFrame, bind, dispatch, serve};
use crate::broker::{Broker, Message, MessageKind, Properties};

async fn start_server(broker: Broker) -> String {
    let listener = bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(serve(listener, broker));
    format!("ws://{addr}")
}

#[test]
fn test_request_frame_parsing() {
    let frame: RequestFrame = serde_json::from_value(json!({
        "request_id": 3,
        "type": "listen",
        "client_id": 4242,
        "properties": {"host": "build-01"}
    }))
    .unwrap();
    assert_eq!(frame.request_id, Some(3));
    match frame.request {
        Request::Listen {
            client_id,
            properties,
        } => {
            assert_eq!(client_id, 4242);
            assert_eq!(properties["host"], "build-01");
        }
        other => panic!("Expected listen, got {other:?}"),
    }

    let frame: RequestFrame = serde_json::from_value(json!({"type": "disable"})).unwrap();
    assert_eq!(frame.request_id, None);
    assert_eq!(frame.request, Request::Disable);

    let frame: RequestFrame =
        serde_json::from_value(json!({"type": "listen", "client_id": 1})).unwrap();
    assert_eq!(
        frame.request,
        Request::Listen {
            client_id: 1,
            properties: Properties::new()
        }
    );

    assert!(serde_json::from_value::<RequestFrame>(json!({"type": "subscribe"})).is_err());
}

#[test]
fn test_reply_frame_shape() {
    let frame = ReplyFrame {
        request_id: Some(9),
        reply: Reply::Message {
            message: Message::text(MessageKind::Disconnected, "Disconnected"),
        },
    };
    let value = serde_json::to_value(&frame).unwrap();
    assert_eq!(value["request_id"], 9);
    assert_eq!(value["type"], "message");
    assert_eq!(value["message"]["kind"], 3);

    let ack = serde_json::to_value(ReplyFrame {
        request_id: None,
        reply: Reply::Ack,
    })
    .unwrap();
    assert_eq!(ack, json!({"type": "ack"}));
}

#[tokio::test]
async fn test_dispatch_runs_requests_against_broker() {
    let broker = Broker::default();
    let note = Message::text(MessageKind::Message, "note");

    let reply = dispatch(
        &broker,
        Request::SendToMany {
            client_ids: vec![1, 2],
            message: note.clone(),
        },
    )
    .await;
    assert_eq!(reply, Reply::Ack);
    assert_eq!(broker.backlog_len(2), 1);

    let reply = dispatch(
        &broker,
        Request::Listen {
            client_id: 1,
            properties: Properties::new(),
        },
    )
    .await;
    assert_eq!(reply, Reply::Message { message: note });

    assert_eq!(dispatch(&broker, Request::Disable).await, Reply::Ack);
    assert!(broker.is_disabled());
    assert_eq!(dispatch(&broker, Request::Enable).await, Reply::Ack);

    match dispatch(&broker, Request::ClearBacklog { client_id: 2 }).await {
        Reply::Message { message } => assert_eq!(message.kind(), MessageKind::BacklogCleared),
        other => panic!("Expected message, got {other:?}"),
    }
    assert_eq!(broker.backlog_len(2), 0);

    match dispatch(&broker, Request::Disconnect { client_id: 1 }).await {
        Reply::Message { message } => assert_eq!(message.kind(), MessageKind::Disconnected),
        other => panic!("Expected message, got {other:?}"),
    }
}

#[tokio::test]
async fn test_invalid_frame_gets_error_reply() {
    let url = start_server(Broker::default()).await;
    let (mut ws, _) = connect_async(url).await.expect("connect");

    ws.send(WsMessage::text("{\"type\": \"subscribe\"}"))
        .await
        .unwrap();

    let response = ws.next().await.expect("reply").unwrap();
    let frame: ReplyFrame = serde_json::from_slice(&response.into_data()).unwrap();
    assert_eq!(frame.request_id, None);
    assert!(matches!(frame.reply, Reply::Error { .. }));
}

#[tokio::test]
async fn test_parked_listen_does_not_block_connection() {
    let broker = Broker::default();
    let url = start_server(broker.clone()).await;
    let (mut ws, _) = connect_async(url).await.expect("connect");

    let listen = json!({"request_id": 1, "type": "listen", "client_id": 77});
    ws.send(WsMessage::text(listen.to_string())).await.unwrap();

    let message = Message::text(MessageKind::Message, "over the wire");
    let send = RequestFrame {
        request_id: Some(2),
        request: Request::Send {
            client_id: 77,
            message: message.clone(),
        },
    };
    // Give the listen a chance to park first so the send is a direct delivery.
    for _ in 0..100 {
        if broker.is_parked(77) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    ws.send(WsMessage::text(serde_json::to_string(&send).unwrap()))
        .await
        .unwrap();

    let mut replies = Vec::new();
    while replies.len() < 2 {
        let response = ws.next().await.expect("reply").unwrap();
        if response.is_text() {
            replies.push(serde_json::from_slice::<ReplyFrame>(&response.into_data()).unwrap());
        }
    }
    replies.sort_by_key(|frame| frame.request_id);

    assert_eq!(replies[0].request_id, Some(1));
    assert_eq!(replies[0].reply, Reply::Message { message });
    assert_eq!(replies[1].request_id, Some(2));
    assert_eq!(replies[1].reply, Reply::Ack);
    assert_eq!(broker.backlog_len(77), 0);
}

#[tokio::test]
async fn test_closed_connection_releases_parked_poll() {
    let broker = Broker::default();
    let url = start_server(broker.clone()).await;
    let (mut ws, _) = connect_async(url).await.expect("connect");

    let listen = json!({"request_id": 1, "type": "listen", "client_id": 88});
    ws.send(WsMessage::text(listen.to_string())).await.unwrap();
    for _ in 0..100 {
        if broker.is_parked(88) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(broker.is_parked(88));

    ws.close(None).await.unwrap();
    for _ in 0..100 {
        if !broker.is_parked(88) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(!broker.is_parked(88));

    broker.send(88, Message::text(MessageKind::Message, "kept for later"));
    assert_eq!(broker.backlog_len(88), 1);
}
