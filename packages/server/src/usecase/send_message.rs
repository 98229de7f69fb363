//! UseCase: チャットメッセージの送信
//!
//! メッセージを永続化してから、送信者を含むルームの全購読者へ配信します。
//! 永続化に失敗したメッセージは配信しません。

use std::sync::Arc;

use crate::domain::{ChatMessage, GroupBroadcaster, GroupEvent, MessageRepository};

use super::{error::SendMessageError, lifecycle::Connection};

pub struct SendMessageUseCase {
    messages: Arc<dyn MessageRepository>,
    broadcaster: Arc<dyn GroupBroadcaster>,
}

impl SendMessageUseCase {
    pub fn new(
        messages: Arc<dyn MessageRepository>,
        broadcaster: Arc<dyn GroupBroadcaster>,
    ) -> Self {
        Self {
            messages,
            broadcaster,
        }
    }

    /// Persist `content` sent on `connection`, then relay it to the room
    pub async fn execute(
        &self,
        connection: &Connection,
        content: String,
    ) -> Result<ChatMessage, SendMessageError> {
        let message = self
            .messages
            .create_message(&connection.user, &connection.room, &content)
            .await
            .map_err(SendMessageError::Persistence)?;

        let delivered = self
            .broadcaster
            .publish(
                &connection.group,
                GroupEvent::UserMessage {
                    username: connection.user.username.clone(),
                    content,
                },
            )
            .await?;
        tracing::debug!(
            "Message {} from '{}' delivered to {} connection(s)",
            message.id,
            connection.member.client_key,
            delivered
        );

        Ok(message)
    }
}
