//! Conversion logic between domain events and wire frames.
//!
//! Frames are rendered per recipient at delivery time, so the `datetime` of a
//! relayed message is the recipient's delivery time, not the send time.

use hiroba_shared::time::{Clock, current_datetime};

use crate::domain::{GroupEvent, Members};
use crate::infrastructure::dto::websocket::{
    ChatFrame, MemberMap, PresenceFrame, SYSTEM_USERNAME, ServerFrame,
};

/// Domain member snapshot -> wire member map (order preserved)
pub fn to_member_map(members: &Members) -> MemberMap {
    members
        .iter()
        .map(|(key, name)| (key.as_str().to_string(), name.as_str().to_string()))
        .collect()
}

/// Render `event` for a subscriber of the room labelled `room_label`
pub fn render_event(event: GroupEvent, room_label: &str, clock: &dyn Clock) -> ServerFrame {
    let datetime = current_datetime(clock);
    match event {
        GroupEvent::MemberJoined { member, members } => ServerFrame::Connect(PresenceFrame {
            username: SYSTEM_USERNAME.to_string(),
            datetime,
            content: format!("Join {} to {}", member.display_name, room_label),
            members: to_member_map(&members),
        }),
        GroupEvent::MemberLeft { member, members } => ServerFrame::Disconnect(PresenceFrame {
            username: SYSTEM_USERNAME.to_string(),
            datetime,
            content: format!("Leave {} from {}", member.display_name, room_label),
            members: to_member_map(&members),
        }),
        GroupEvent::UserMessage { username, content } => ServerFrame::UserMessage(ChatFrame {
            username: username.into_string(),
            datetime,
            content,
        }),
    }
}
