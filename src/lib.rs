//! # Relaycast
//!
//! `relaycast` is a minimal real-time message relay. Clients connect over
//! WebSocket, and every text message one of them sends is rebroadcast to all
//! connected clients, the sender included.
//!
//! ## Core Modules
//!
//! - `registry`: tracks live connections behind a single lock.
//! - `hub`: the broadcast engine that fans a message out to the registry.
//! - `transport`: the WebSocket server and the per-connection read loop.
//! - `config`: loads server and logging settings.
//! - `utils`: the error type and logging setup.

pub mod config;
pub mod hub;
pub mod registry;
pub mod transport;
pub mod utils;
