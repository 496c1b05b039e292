use tracing::{debug, error, info, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::hub::message::Message;
use crate::registry::{Connection, ConnectionId, ConnectionRegistry, Visit};
use crate::utils::RelayError;

/// Counts from a single broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Connections the frame was queued for.
    pub delivered: usize,
    /// Connections that failed the write and were dropped from the registry.
    pub evicted: usize,
}

/// The broadcast hub.
///
/// Owns the [`ConnectionRegistry`] and is shared between connection tasks as
/// an `Arc<Hub>`. Every message handed to [`Hub::broadcast`] goes to every
/// registered connection, including the one that sent it.
#[derive(Debug, Default)]
pub struct Hub {
    registry: ConnectionRegistry,
}

impl Hub {
    pub fn new() -> Self {
        Self {
            registry: ConnectionRegistry::new(),
        }
    }

    #[cfg(test)]
    pub(crate) fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Registers a newly upgraded connection so it receives broadcasts.
    pub fn register(&self, connection: Connection) {
        let id = connection.id;
        let peer = connection.peer;
        let total = self.registry.register(connection);
        info!(
            connection = %id,
            peer = ?peer,
            total,
            "New client connected"
        );
    }

    /// Removes a connection. Removing one that is already gone does nothing.
    pub fn remove(&self, id: &ConnectionId) -> Option<Connection> {
        let (removed, remaining) = self.registry.remove(id)?;
        let session = chrono::Utc::now() - removed.connected_at;
        info!(
            connection = %id,
            session_secs = session.num_seconds(),
            remaining,
            "Client removed"
        );
        Some(removed)
    }

    /// Removes a connection and closes it, which also stops its read loop.
    /// Returns `false` if it was already gone.
    pub fn disconnect(&self, id: &ConnectionId) -> bool {
        match self.remove(id) {
            Some(connection) => {
                connection.close();
                true
            }
            None => false,
        }
    }

    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    /// Sends `message` to every registered connection.
    ///
    /// The message is serialized once; if that fails nothing is sent.
    /// A connection whose write fails, or whose queue is full because the
    /// client stopped reading, is removed and closed; the remaining
    /// connections still receive the message.
    pub fn broadcast(&self, message: &Message) -> Result<BroadcastReport, RelayError> {
        let text = serde_json::to_string(message).map_err(|e| {
            error!(error = %e, "Failed to serialize message");
            RelayError::Encode(e)
        })?;

        debug!(payload = %text, "Broadcasting message");

        let frame = WsMessage::text(text);
        let mut delivered = 0;
        let evicted = self.registry.for_each(|connection| {
            match connection.send(frame.clone()) {
                Ok(()) => {
                    delivered += 1;
                    Visit::Keep
                }
                Err(e) => {
                    warn!(error = %e, "Error sending message to client");
                    Visit::Evict
                }
            }
        });

        for connection in &evicted {
            connection.close();
            info!(connection = %connection.id, "Dropped unreachable client");
        }

        Ok(BroadcastReport {
            delivered,
            evicted: evicted.len(),
        })
    }
}
