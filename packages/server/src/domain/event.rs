//! Events published to a room's broadcast group.

use indexmap::IndexMap;

use super::{
    entity::Member,
    value_object::{ClientKey, DisplayName},
};

/// Member snapshot of one room, in join order
pub type Members = IndexMap<ClientKey, DisplayName>;

/// Event delivered to every subscriber of a group.
///
/// The set of events is closed; subscribers match on it exhaustively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupEvent {
    /// `member` joined; `members` is the snapshot right after the join
    MemberJoined { member: Member, members: Members },
    /// `member` left; `members` is the snapshot right after the leave
    MemberLeft { member: Member, members: Members },
    /// A persisted chat message to relay
    UserMessage {
        username: DisplayName,
        content: String,
    },
}
