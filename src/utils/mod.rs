//! The `utils` module provides definitions shared across the relay:
//! the crate-wide error type and logging initialisation.

pub mod error;
pub mod logging;

pub use error::RelayError;
