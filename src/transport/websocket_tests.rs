use crate::config::ServerSettings;
use crate::hub::Hub;
use crate::registry::{ConnectionId, Visit};
use crate::transport::websocket::{bind, serve};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

async fn setup_server() -> (SocketAddr, Arc<Hub>) {
    let settings = ServerSettings {
        host: "127.0.0.1".to_string(),
        port: 0,
        path: "/ws".to_string(),
    };
    let listener = bind(&settings).await.expect("Failed to bind");
    let addr = listener.local_addr().expect("local_addr");
    let hub = Arc::new(Hub::new());

    tokio::spawn(serve(listener, hub.clone(), settings.path));

    (addr, hub)
}

async fn wait_for_connections(hub: &Hub, expected: usize) {
    timeout(WAIT, async {
        while hub.connection_count() != expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| {
        panic!(
            "expected {expected} connections, have {}",
            hub.connection_count()
        )
    });
}

// Registration happens after the server side of the handshake, so wait for it.
async fn connect(addr: SocketAddr, hub: &Hub, expected: usize) -> Client {
    let (ws_stream, _) = connect_async(format!("ws://{addr}/ws"))
        .await
        .expect("WebSocket handshake failed");
    wait_for_connections(hub, expected).await;
    ws_stream
}

async fn next_text(ws_stream: &mut Client) -> String {
    loop {
        let frame = timeout(WAIT, ws_stream.next())
            .await
            .expect("Timed out waiting for a frame")
            .expect("Stream ended")
            .expect("Read error");
        match frame {
            WsMessage::Text(text) => return text.as_str().to_owned(),
            WsMessage::Ping(_) | WsMessage::Pong(_) => continue,
            other => panic!("Expected a text frame, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_message_reaches_all_clients_including_sender() {
    let (addr, hub) = setup_server().await;
    let mut client_a = connect(addr, &hub, 1).await;
    let mut client_b = connect(addr, &hub, 2).await;

    client_a
        .send(WsMessage::text(r#"{"message":"hello"}"#))
        .await
        .expect("Failed to send");

    assert_eq!(next_text(&mut client_a).await, r#"{"message":"hello"}"#);
    assert_eq!(next_text(&mut client_b).await, r#"{"message":"hello"}"#);
}

#[tokio::test]
async fn test_invalid_json_is_relayed_as_raw_text() {
    let (addr, hub) = setup_server().await;
    let mut client_a = connect(addr, &hub, 1).await;
    let mut client_b = connect(addr, &hub, 2).await;

    client_b
        .send(WsMessage::text("not-json"))
        .await
        .expect("Failed to send");

    assert_eq!(next_text(&mut client_a).await, r#"{"message":"not-json"}"#);
    assert_eq!(next_text(&mut client_b).await, r#"{"message":"not-json"}"#);
    assert_eq!(hub.connection_count(), 2);
}

#[tokio::test]
async fn test_binary_frame_is_decoded() {
    let (addr, hub) = setup_server().await;
    let mut client = connect(addr, &hub, 1).await;

    client
        .send(WsMessage::binary(br#"{"message":"bin"}"#.to_vec()))
        .await
        .expect("Failed to send");

    assert_eq!(next_text(&mut client).await, r#"{"message":"bin"}"#);
}

#[tokio::test]
async fn test_messages_from_one_client_keep_their_order() {
    let (addr, hub) = setup_server().await;
    let mut client = connect(addr, &hub, 1).await;

    for i in 0..10 {
        let text = format!(r#"{{"message":"m{i}"}}"#);
        client
            .send(WsMessage::text(text))
            .await
            .expect("Failed to send");
    }
    for i in 0..10 {
        assert_eq!(next_text(&mut client).await, format!(r#"{{"message":"m{i}"}}"#));
    }
}

#[tokio::test]
async fn test_closed_client_is_removed() {
    let (addr, hub) = setup_server().await;
    let mut client_a = connect(addr, &hub, 1).await;
    let mut client_b = connect(addr, &hub, 2).await;

    client_b.close(None).await.expect("Failed to close");
    wait_for_connections(&hub, 1).await;

    client_a
        .send(WsMessage::text(r#"{"message":"after"}"#))
        .await
        .expect("Failed to send");
    assert_eq!(next_text(&mut client_a).await, r#"{"message":"after"}"#);
    assert_eq!(hub.connection_count(), 1);
}

fn connection_ids(hub: &Hub) -> Vec<ConnectionId> {
    let mut ids = Vec::new();
    hub.registry().for_each(|connection| {
        ids.push(connection.id);
        Visit::Keep
    });
    ids
}

// Same path the writer takes when a socket write fails.
#[tokio::test]
async fn test_server_side_disconnect_stops_relaying_from_that_client() {
    let (addr, hub) = setup_server().await;
    let mut client_a = connect(addr, &hub, 1).await;
    let a_id = connection_ids(&hub)[0];
    let mut client_b = connect(addr, &hub, 2).await;
    let b_id = connection_ids(&hub)
        .into_iter()
        .find(|id| *id != a_id)
        .expect("second connection registered");

    assert!(hub.disconnect(&b_id));
    assert_eq!(hub.connection_count(), 1);

    // B has not read the Close frame yet, so this still goes out on the wire
    client_b
        .send(WsMessage::text(r#"{"message":"ghost"}"#))
        .await
        .expect("Failed to send");
    tokio::time::sleep(Duration::from_millis(100)).await;

    client_a
        .send(WsMessage::text(r#"{"message":"real"}"#))
        .await
        .expect("Failed to send");
    assert_eq!(next_text(&mut client_a).await, r#"{"message":"real"}"#);
    assert_eq!(hub.connection_count(), 1);

    // client B is told to go away
    let frame = timeout(WAIT, client_b.next())
        .await
        .expect("Timed out waiting for close");
    assert!(matches!(
        frame,
        Some(Ok(WsMessage::Close(_))) | None | Some(Err(_))
    ));
}

#[tokio::test]
async fn test_dropped_client_is_removed() {
    let (addr, hub) = setup_server().await;
    let client = connect(addr, &hub, 1).await;

    drop(client);
    wait_for_connections(&hub, 0).await;
}

#[tokio::test]
async fn test_upgrade_on_other_path_is_rejected() {
    let (addr, hub) = setup_server().await;

    match connect_async(format!("ws://{addr}/elsewhere")).await {
        Err(tungstenite::Error::Http(response)) => {
            assert_eq!(response.status().as_u16(), 404);
        }
        Err(other) => panic!("Expected an HTTP error, got {other:?}"),
        Ok(_) => panic!("Upgrade on an unknown path should fail"),
    }
    assert_eq!(hub.connection_count(), 0);
}

#[tokio::test]
async fn test_many_clients_receive_broadcast() {
    let (addr, hub) = setup_server().await;
    let mut clients = Vec::new();
    for n in 1..=8 {
        clients.push(connect(addr, &hub, n).await);
    }

    clients[3]
        .send(WsMessage::text(r#"{"message":"fan-out"}"#))
        .await
        .expect("Failed to send");

    for client in clients.iter_mut() {
        assert_eq!(next_text(client).await, r#"{"message":"fan-out"}"#);
    }
}
