//! Wire format exchanged over the room websocket.
//!
//! Server -> client frames are tagged by `type`:
//!
//! ```text
//! {"type":"connect","username":"system","datetime":"2024-01-02 03:04:05","content":"Join alice to Room 7","members":{"user1":"alice"}}
//! {"type":"disconnect", ...same shape...}
//! {"type":"user_message","username":"alice","datetime":"2024-01-02 03:04:05","content":"hi"}
//! ```
//!
//! Client -> server payloads carry only the message text: `{"content":"hi"}`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Sender name used for presence announcements
pub const SYSTEM_USERNAME: &str = "system";

/// Member snapshot: client key -> display name, in join order
pub type MemberMap = IndexMap<String, String>;

/// Frame pushed from the server to a connected client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// A member joined the room
    Connect(PresenceFrame),
    /// A member left the room
    Disconnect(PresenceFrame),
    /// A chat message relayed to the room
    UserMessage(ChatFrame),
}

/// Presence announcement body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceFrame {
    pub username: String,
    pub datetime: String,
    pub content: String,
    pub members: MemberMap,
}

/// Relayed chat message body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatFrame {
    pub username: String,
    pub datetime: String,
    pub content: String,
}

/// Payload sent by a client to post a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientPayload {
    pub content: String,
}
