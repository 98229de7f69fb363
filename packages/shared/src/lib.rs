//! Code shared between the Hiroba server and client.

pub mod logger;
pub mod protocol;
pub mod time;
