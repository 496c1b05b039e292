//! The `hub` module fans each message out to every registered connection.

pub mod engine;
pub mod message;

pub use engine::{BroadcastReport, Hub};
pub use message::Message;
