//! Hiroba chat room server library.
//!
//! Websocket rooms with presence announcements and a persisted message relay.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
