//! Group broadcast trait 定義
//!
//! ルームごとのブロードキャストグループへの購読と配信のインターフェース。
//! 配信は購読者ごとの `Outbox` に積まれ、同じグループへの publish は呼び出し順に届きます。

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{BroadcastError, ConnectionId, GroupEvent, GroupName};

/// Per-connection queue of delivered events
pub type Outbox = mpsc::UnboundedSender<GroupEvent>;

/// Receiving end of an [`Outbox`]
pub type EventReceiver = mpsc::UnboundedReceiver<GroupEvent>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GroupBroadcaster: Send + Sync {
    /// `connection_id` を `group` の購読者として登録
    async fn subscribe(&self, group: &GroupName, connection_id: ConnectionId, outbox: Outbox);

    /// `connection_id` の購読を解除（outbox は破棄される）
    async fn unsubscribe(&self, group: &GroupName, connection_id: ConnectionId);

    /// `group` の全購読者に配信し、配信できた購読者数を返す
    async fn publish(&self, group: &GroupName, event: GroupEvent)
    -> Result<usize, BroadcastError>;
}
