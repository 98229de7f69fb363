//! Hiroba CLI chat client.
//!
//! Connects to a room, prints presence and chat frames, and sends each entered
//! line as a message. Reconnects on lost connections, but not when the server
//! rejected the connection.

pub mod domain;
pub mod error;
pub mod formatter;
mod runner;
mod session;
mod ui;

pub use runner::run_client;
