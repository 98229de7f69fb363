//! Data Transfer Objects (DTOs) for the chat application.
//!
//! - `websocket`: frames exchanged over the room websocket (shared with the client)
//! - `conversion`: rendering of domain events into frames

pub mod conversion;

pub use hiroba_shared::protocol as websocket;
