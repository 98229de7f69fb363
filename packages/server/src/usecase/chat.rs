//! UseCase: チャットルーム接続のフック
//!
//! 接続の受付時に参加を、切断時に退出を通知し、最後のメンバーが抜けた
//! ルームのエントリを削除します。

use std::sync::Arc;

use async_trait::async_trait;

use super::{
    error::LifecycleError,
    lifecycle::{Connection, ConnectionHooks},
    presence::PresenceNotifier,
};

/// Group name prefix of chat room connections (`chat-room{id}`)
pub const CHAT_GROUP_PREFIX: &str = "chat-room";

pub struct ChatHooks {
    presence: Arc<PresenceNotifier>,
}

impl ChatHooks {
    pub fn new(presence: Arc<PresenceNotifier>) -> Self {
        Self { presence }
    }
}

#[async_trait]
impl ConnectionHooks for ChatHooks {
    fn group_prefix(&self) -> &'static str {
        CHAT_GROUP_PREFIX
    }

    async fn after_accept(&self, connection: &Connection) -> Result<(), LifecycleError> {
        self.presence
            .announce_join(&connection.group, &connection.member)
            .await?;
        Ok(())
    }

    async fn before_disconnect(&self, connection: &Connection) -> Result<(), LifecycleError> {
        self.presence
            .announce_leave(&connection.group, &connection.member)
            .await?;
        Ok(())
    }

    async fn after_disconnect(&self, connection: &Connection) {
        self.presence.prune_if_empty(&connection.group).await;
    }
}
