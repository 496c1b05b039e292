//! WebSocket transport
//!
//! Accepts TCP connections, upgrades the ones that target the configured path,
//! and runs one task per connection:
//! - a writer that drains the connection's bounded outbound queue into the socket
//! - the read loop, which decodes each inbound frame and hands it to the hub
//!   before reading the next one, and stops as soon as the server closes the
//!   connection
//!
//! Origins are not checked; any client that reaches the path is accepted.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::accept_hdr_async;
use tracing::{debug, info, warn};
use tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tungstenite::http::StatusCode;
use tungstenite::protocol::Message as WsMessage;

use crate::config::ServerSettings;
use crate::hub::Hub;
use crate::registry::Connection;
use crate::transport::message::Inbound;
use crate::utils::RelayError;

/// Pause after a failed `accept`, e.g. when the process is out of file descriptors.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Frames queued per client before it counts as unreachable and is evicted.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 64;

/// How long a closing connection's writer may take to flush before it is aborted.
const WRITER_GRACE: Duration = Duration::from_secs(2);

/// Binds the listening socket described by `settings`.
pub async fn bind(settings: &ServerSettings) -> Result<TcpListener, RelayError> {
    let addr = settings.bind_addr();
    TcpListener::bind(&addr)
        .await
        .map_err(|source| RelayError::Bind {
            addr: addr.clone(),
            source,
        })
}

/// Binds and serves until the process is stopped.
pub async fn start_websocket_server(
    settings: &ServerSettings,
    hub: Arc<Hub>,
) -> Result<(), RelayError> {
    let listener = bind(settings).await?;
    serve(listener, hub, settings.path.clone()).await;
    Ok(())
}

/// Accept loop. Spawns a task per incoming connection and never returns.
pub async fn serve(listener: TcpListener, hub: Arc<Hub>, path: String) {
    let path: Arc<str> = path.into();

    if let Ok(addr) = listener.local_addr() {
        info!("WebSocket server listening on ws://{addr}{path}");
    }

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(error = %e, "Failed to accept connection");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
                continue;
            }
        };

        let hub = hub.clone();
        let path = path.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer, hub, &path).await {
                warn!(%peer, error = %e, "Error upgrading connection");
            }
        });
    }
}

fn not_found() -> ErrorResponse {
    let mut response = ErrorResponse::new(Some("not found".to_string()));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}

/// Runs one connection from upgrade to close.
///
/// Only a failed upgrade is reported as an error; in that case the
/// connection was never registered.
async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    hub: Arc<Hub>,
    path: &str,
) -> Result<(), RelayError> {
    let ws_stream = accept_hdr_async(stream, |request: &Request, response: Response| {
        if request.uri().path() == path {
            Ok(response)
        } else {
            debug!(%peer, path = request.uri().path(), "Rejecting upgrade on unknown path");
            Err(not_found())
        }
    })
    .await?;

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (tx, mut rx) = mpsc::channel::<WsMessage>(OUTBOUND_QUEUE_CAPACITY);

    // The registry holds the only sender, so removing the connection ends the writer.
    let connection = Connection::new(tx).with_peer(peer);
    let id = connection.id;
    let shutdown = connection.shutdown_signal();
    hub.register(connection);

    let mut writer = {
        let hub = hub.clone();
        tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                if let Err(e) = ws_sender.send(frame).await {
                    warn!(connection = %id, error = %e, "Failed to send message to client");
                    hub.disconnect(&id);
                    break;
                }
            }
            let _ = ws_sender.close().await;
            debug!(connection = %id, "Send loop closed");
        })
    };

    loop {
        let frame = tokio::select! {
            biased;
            _ = shutdown.notified() => {
                info!(connection = %id, "Connection closed by server");
                break;
            }
            frame = ws_receiver.next() => frame,
        };

        let inbound = match frame {
            Some(Ok(WsMessage::Text(text))) => Inbound::decode(text.as_bytes()),
            Some(Ok(WsMessage::Binary(data))) => Inbound::decode(&data),
            Some(Ok(WsMessage::Close(_))) | None => {
                info!(connection = %id, "Client disconnected");
                break;
            }
            // Ping/Pong are answered by tungstenite.
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                info!(connection = %id, error = %e, "Client disconnected");
                break;
            }
        };

        if inbound.is_raw() {
            debug!(connection = %id, "Error parsing JSON, using raw message");
        }
        let message = inbound.into_message();
        debug!(connection = %id, message = %message.message, "Received message");

        // Encode failures are logged by the hub; the connection stays up.
        if let Ok(report) = hub.broadcast(&message) {
            debug!(
                delivered = report.delivered,
                evicted = report.evicted,
                "Broadcast complete"
            );
        }
    }

    hub.remove(&id);

    // A peer that stopped reading can leave the writer stuck on the socket.
    if tokio::time::timeout(WRITER_GRACE, &mut writer).await.is_err() {
        writer.abort();
    }
    Ok(())
}
