//! Repository trait 定義
//!
//! ドメイン層が必要とするデータアクセスのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

use async_trait::async_trait;

use super::{ChatMessage, RepositoryError, Room, RoomId, User, UserId};

/// Room lookup and the room's authorization predicate
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// Room を取得（存在しない場合は `RoomNotFound`）
    async fn get_room(&self, room_id: RoomId) -> Result<Room, RepositoryError>;

    /// `user` が `room` に参加できるかを判定
    async fn is_authorized(&self, room: &Room, user: &User) -> Result<bool, RepositoryError>;
}

/// Backing lookup of the session provider
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_user(&self, user_id: UserId) -> Result<User, RepositoryError>;
}

/// Message persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// メッセージを保存し、保存されたメッセージを返す
    async fn create_message(
        &self,
        sender: &User,
        room: &Room,
        content: &str,
    ) -> Result<ChatMessage, RepositoryError>;
}
