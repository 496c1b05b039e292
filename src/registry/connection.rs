use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Notify;
use tokio::sync::mpsc::{self, error::TrySendError};
use tungstenite::protocol::Message as WsMessage;
use uuid::Uuid;

use crate::utils::RelayError;

/// Unique identifier of a connection for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Represents a connected WebSocket client.
///
/// Frames are not written to the socket directly: they are queued on a
/// bounded `sender`, and the connection's writer task drains the queue.
/// A full queue (the client stopped reading) or a stopped writer both make
/// [`Connection::send`] fail.
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    pub peer: Option<SocketAddr>,
    pub connected_at: DateTime<Utc>,
    sender: mpsc::Sender<WsMessage>,
    shutdown: Arc<Notify>,
}

impl Connection {
    pub fn new(sender: mpsc::Sender<WsMessage>) -> Self {
        Self {
            id: ConnectionId::new(),
            peer: None,
            connected_at: Utc::now(),
            sender,
            shutdown: Arc::new(Notify::new()),
        }
    }

    pub fn with_peer(mut self, peer: SocketAddr) -> Self {
        self.peer = Some(peer);
        self
    }

    /// Queues a frame for this client without waiting.
    pub fn send(&self, frame: WsMessage) -> Result<(), RelayError> {
        self.sender.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => RelayError::QueueFull(self.id),
            TrySendError::Closed(_) => RelayError::ConnectionClosed(self.id),
        })
    }

    /// Closes the connection from the server side.
    ///
    /// Queues a Close frame if there is room and wakes the read loop so it
    /// stops relaying anything else this client sends.
    pub fn close(&self) {
        let _ = self.sender.try_send(WsMessage::Close(None));
        self.shutdown.notify_one();
    }

    /// Signal fired by [`Connection::close`].
    ///
    /// Handed to the read loop instead of a clone of the connection, which
    /// would keep the outbound queue open after removal.
    pub(crate) fn shutdown_signal(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }
}
