//! InMemory chat repository 実装
//!
//! ドメイン層が定義する `RoomRepository` / `UserRepository` / `MessageRepository`
//! の具体的な実装。ユーザーとルームは起動時のシードから作られ、以後は読み取り専用です。
//! メッセージは Vec をインメモリ DB として追記します。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use hiroba_shared::time::Clock;
use tokio::sync::Mutex;

use crate::domain::{
    ChatMessage, MessageRepository, RepositoryError, Room, RoomId, RoomRepository, User, UserId,
    UserRepository,
};

/// インメモリ chat repository 実装
pub struct InMemoryChatRepository {
    users: HashMap<UserId, User>,
    rooms: HashMap<RoomId, Room>,
    /// 保存済みメッセージ（作成順）
    messages: Mutex<Vec<ChatMessage>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryChatRepository {
    /// 新しい InMemoryChatRepository を作成
    pub fn new(users: Vec<User>, rooms: Vec<Room>, clock: Arc<dyn Clock>) -> Self {
        Self {
            users: users.into_iter().map(|user| (user.id, user)).collect(),
            rooms: rooms.into_iter().map(|room| (room.id, room)).collect(),
            messages: Mutex::new(Vec::new()),
            clock,
        }
    }

    /// 保存済みメッセージの一覧（作成順）
    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.messages.lock().await.clone()
    }

    /// 指定ルームの保存済みメッセージ（作成順）
    pub async fn messages_in(&self, room_id: RoomId) -> Vec<ChatMessage> {
        self.messages
            .lock()
            .await
            .iter()
            .filter(|message| message.room == room_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl RoomRepository for InMemoryChatRepository {
    async fn get_room(&self, room_id: RoomId) -> Result<Room, RepositoryError> {
        self.rooms
            .get(&room_id)
            .cloned()
            .ok_or(RepositoryError::RoomNotFound(room_id))
    }

    async fn is_authorized(&self, room: &Room, user: &User) -> Result<bool, RepositoryError> {
        Ok(room.is_assigned(user.id))
    }
}

#[async_trait]
impl UserRepository for InMemoryChatRepository {
    async fn get_user(&self, user_id: UserId) -> Result<User, RepositoryError> {
        self.users
            .get(&user_id)
            .cloned()
            .ok_or(RepositoryError::UserNotFound(user_id))
    }
}

#[async_trait]
impl MessageRepository for InMemoryChatRepository {
    async fn create_message(
        &self,
        sender: &User,
        room: &Room,
        content: &str,
    ) -> Result<ChatMessage, RepositoryError> {
        if !self.rooms.contains_key(&room.id) {
            return Err(RepositoryError::RoomNotFound(room.id));
        }

        let mut messages = self.messages.lock().await;
        let message = ChatMessage {
            id: messages.len() as u64 + 1,
            sender: sender.id,
            room: room.id,
            content: content.to_string(),
            created_at: self.clock.now(),
        };
        messages.push(message.clone());
        tracing::debug!(
            "Stored message #{} from user {} in room {}",
            message.id,
            sender.id,
            room.id
        );

        Ok(message)
    }
}
