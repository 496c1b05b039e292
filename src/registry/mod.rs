//! The `registry` module tracks the connections that are currently live.
//!
//! A [`Connection`] is the relay's handle to one client: an identifier plus the
//! queue feeding that client's socket writer. The [`ConnectionRegistry`] owns
//! every registered handle behind a single lock, which is the only point where
//! concurrent connects, disconnects and broadcasts are serialized.

pub mod connection;
pub mod store;

pub use connection::{Connection, ConnectionId};
pub use store::{ConnectionRegistry, Visit};
