//! The `transport` module handles network communication with clients.
//!
//! It decodes inbound frames into [`Message`](crate::hub::Message)s and runs
//! the WebSocket server: accepting upgrades, registering each connection with
//! the hub, and relaying what each client sends.

pub mod message;
pub mod websocket;

pub use message::Inbound;
pub use websocket::{bind, serve, start_websocket_server};


#[cfg(test)]
mod websocket_tests;
