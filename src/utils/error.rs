//! Error types used within the relay.
//!
//! Most failures are handled where they occur and only logged; the variants
//! here cover what crosses a function boundary.

use config::ConfigError;
use thiserror::Error;

use crate::registry::ConnectionId;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("connection {0} is closed")]
    ConnectionClosed(ConnectionId),

    #[error("outbound queue for {0} is full")]
    QueueFull(ConnectionId),

    #[error("websocket handshake failed: {0}")]
    Handshake(#[from] tungstenite::Error),
}
