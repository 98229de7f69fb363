//! Entities

use chrono::{DateTime, Local};

use super::value_object::{ClientKey, DisplayName, RoomId, UserId};

/// Registered user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: DisplayName,
}

impl User {
    pub fn new(id: UserId, username: DisplayName) -> Self {
        Self { id, username }
    }
}

/// Persisted chat room.
///
/// Rooms are owned by the persistence layer; the chat core only reads them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub id: RoomId,
    /// Label used in presence announcements ("Join alice to <name>")
    pub name: String,
    pub owner: UserId,
    pub participants: Vec<UserId>,
}

impl Room {
    pub fn new(id: RoomId, name: String, owner: UserId, participants: Vec<UserId>) -> Self {
        Self {
            id,
            name,
            owner,
            participants,
        }
    }

    /// Whether `user_id` may join this room (owner or assigned participant)
    pub fn is_assigned(&self, user_id: UserId) -> bool {
        self.owner == user_id || self.participants.contains(&user_id)
    }
}

/// A user while one of their sockets is joined to a room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub client_key: ClientKey,
    pub display_name: DisplayName,
}

impl Member {
    pub fn from_user(user: &User) -> Self {
        Self {
            client_key: ClientKey::for_user(user.id),
            display_name: user.username.clone(),
        }
    }
}

/// Persisted chat message; never mutated after creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: u64,
    pub sender: UserId,
    pub room: RoomId,
    pub content: String,
    pub created_at: DateTime<Local>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room() -> Room {
        Room::new(
            RoomId::new(7),
            "Room 7".to_string(),
            UserId::new(1),
            vec![UserId::new(2), UserId::new(3)],
        )
    }

    #[test]
    fn test_owner_is_assigned() {
        // テスト項目: ルームのオーナーは参加を許可される
        // given (前提条件):
        let room = room();

        // when (操作):
        let assigned = room.is_assigned(UserId::new(1));

        // then (期待する結果):
        assert!(assigned);
    }

    #[test]
    fn test_participant_is_assigned() {
        // テスト項目: 参加者として登録されたユーザーは参加を許可される
        // given (前提条件):
        let room = room();

        // when (操作):
        let assigned = room.is_assigned(UserId::new(3));

        // then (期待する結果):
        assert!(assigned);
    }

    #[test]
    fn test_stranger_is_not_assigned() {
        // テスト項目: 登録されていないユーザーは参加を許可されない
        // given (前提条件):
        let room = room();

        // when (操作):
        let assigned = room.is_assigned(UserId::new(99));

        // then (期待する結果):
        assert!(!assigned);
    }

    #[test]
    fn test_member_from_user() {
        // テスト項目: User から ClientKey と表示名を持つ Member が作られる
        // given (前提条件):
        let user = User::new(
            UserId::new(5),
            DisplayName::new("erin".to_string()).unwrap(),
        );

        // when (操作):
        let member = Member::from_user(&user);

        // then (期待する結果):
        assert_eq!(member.client_key.as_str(), "user5");
        assert_eq!(member.display_name.as_str(), "erin");
    }
}
