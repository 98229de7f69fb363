//! In-process `GroupBroadcaster` implementation
//!
//! ## 責務
//!
//! - グループ名ごとに購読中の接続と outbox を管理
//! - publish されたイベントを全購読者の outbox に積む
//!
//! ## 設計ノート
//!
//! outbox の生成は UI 層（`ui/handler/websocket.rs`）で行われます。
//! publish はロックを保持したまま全購読者へ送るため、同じグループへの
//! publish は呼び出し順に各接続へ届きます（グループ単位の FIFO）。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{BroadcastError, ConnectionId, GroupBroadcaster, GroupEvent, GroupName, Outbox};

/// 単一プロセス内で完結する GroupBroadcaster 実装
#[derive(Default)]
pub struct InMemoryGroupBroadcaster {
    /// グループ名 -> (接続 ID -> outbox)
    groups: Mutex<HashMap<GroupName, HashMap<ConnectionId, Outbox>>>,
}

impl InMemoryGroupBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// `group` の購読者数
    pub async fn subscriber_count(&self, group: &GroupName) -> usize {
        self.groups
            .lock()
            .await
            .get(group)
            .map_or(0, |subscribers| subscribers.len())
    }
}

#[async_trait]
impl GroupBroadcaster for InMemoryGroupBroadcaster {
    async fn subscribe(&self, group: &GroupName, connection_id: ConnectionId, outbox: Outbox) {
        let mut groups = self.groups.lock().await;
        groups
            .entry(group.clone())
            .or_default()
            .insert(connection_id, outbox);
        tracing::debug!("Connection '{}' subscribed to '{}'", connection_id, group);
    }

    async fn unsubscribe(&self, group: &GroupName, connection_id: ConnectionId) {
        let mut groups = self.groups.lock().await;
        if let Some(subscribers) = groups.get_mut(group) {
            subscribers.remove(&connection_id);
            if subscribers.is_empty() {
                groups.remove(group);
            }
        }
        tracing::debug!("Connection '{}' unsubscribed from '{}'", connection_id, group);
    }

    async fn publish(
        &self,
        group: &GroupName,
        event: GroupEvent,
    ) -> Result<usize, BroadcastError> {
        let groups = self.groups.lock().await;
        let Some(subscribers) = groups.get(group) else {
            tracing::debug!("No subscribers in '{}', dropping event", group);
            return Ok(0);
        };

        let mut delivered = 0;
        for (connection_id, outbox) in subscribers {
            // 切断処理中の接続への送信失敗は許容する
            if outbox.send(event.clone()).is_err() {
                tracing::warn!(
                    "Outbox of connection '{}' in '{}' is closed, skipping",
                    connection_id,
                    group
                );
            } else {
                delivered += 1;
            }
        }
        tracing::debug!("Published event to {} subscriber(s) of '{}'", delivered, group);

        Ok(delivered)
    }
}
