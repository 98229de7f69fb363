//! UseCase: プレゼンス通知
//!
//! メンバー一覧（`RoomPresence`）を所有し、参加・退出のたびに一覧を更新して
//! ルームのグループへ通知します。一覧の更新と publish は同じロックの中で行うため、
//! 同時に参加しても更新が失われず、各接続にはスナップショットが生成順に届きます。
//! publish は outbox に積むだけなので、ロックを保持する時間は短く済みます。

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::domain::{
    ClientKey, GroupBroadcaster, GroupEvent, GroupName, Member, Members, RoomPresence,
};

use super::error::LifecycleError;

/// Owner of the process-wide membership registry
pub struct PresenceNotifier {
    presence: Mutex<RoomPresence>,
    broadcaster: Arc<dyn GroupBroadcaster>,
}

impl PresenceNotifier {
    pub fn new(broadcaster: Arc<dyn GroupBroadcaster>) -> Self {
        Self {
            presence: Mutex::new(RoomPresence::new()),
            broadcaster,
        }
    }

    /// Add `member` to `group` and announce it with the new snapshot
    pub async fn announce_join(
        &self,
        group: &GroupName,
        member: &Member,
    ) -> Result<Members, LifecycleError> {
        let mut presence = self.presence.lock().await;
        presence.insert(group, member)?;
        let members = presence.members(group);

        let event = GroupEvent::MemberJoined {
            member: member.clone(),
            members: members.clone(),
        };
        if let Err(e) = self.broadcaster.publish(group, event).await {
            // 通知できなかった参加は取り消す
            presence.remove(group, &member.client_key)?;
            presence.prune_if_empty(group);
            return Err(e.into());
        }
        tracing::info!(
            "'{}' joined '{}' ({} member(s))",
            member.client_key,
            group,
            members.len()
        );

        Ok(members)
    }

    /// Remove `member` from `group` and announce it with the new snapshot.
    ///
    /// Fails with `RegistryError::NotMember` (nothing published) if the member
    /// was never joined or already left.
    pub async fn announce_leave(
        &self,
        group: &GroupName,
        member: &Member,
    ) -> Result<Members, LifecycleError> {
        let mut presence = self.presence.lock().await;
        presence.remove(group, &member.client_key)?;
        let members = presence.members(group);

        let event = GroupEvent::MemberLeft {
            member: member.clone(),
            members: members.clone(),
        };
        self.broadcaster.publish(group, event).await?;
        tracing::info!(
            "'{}' left '{}' ({} member(s))",
            member.client_key,
            group,
            members.len()
        );

        Ok(members)
    }

    /// Delete the registry entry of `group` if nobody is left. Returns whether it was deleted.
    pub async fn prune_if_empty(&self, group: &GroupName) -> bool {
        let pruned = self.presence.lock().await.prune_if_empty(group);
        if pruned {
            tracing::debug!("Pruned empty registry entry '{}'", group);
        }
        pruned
    }

    pub async fn members(&self, group: &GroupName) -> Members {
        self.presence.lock().await.members(group)
    }

    pub async fn is_member(&self, group: &GroupName, client_key: &ClientKey) -> bool {
        self.presence.lock().await.contains(group, client_key)
    }

    /// Whether the registry holds an entry for `group`, empty or not
    pub async fn has_room(&self, group: &GroupName) -> bool {
        self.presence.lock().await.has_room(group)
    }
}
