//! UseCase: 接続ライフサイクル
//!
//! 接続の受付（ルームの存在確認・参加可否の判定）、グループへの購読、
//! 参加・退出フックの呼び出し、切断時の後片付けを担います。
//!
//! 後片付けは `ConnectionGuard` が一度だけ実行します。`teardown` を呼ばずに
//! guard が破棄された場合（タスクのキャンセルや panic）は `Drop` から同じ手順を起動します。

use std::{future::Future, sync::Arc};

use async_trait::async_trait;

use crate::domain::{
    ClientKey, ConnectionId, GroupBroadcaster, GroupName, Member, Outbox, RepositoryError, Room,
    RoomId, RoomRepository, User, UserId, UserRepository,
};

use super::{
    error::{ConnectError, LifecycleError},
    presence::PresenceNotifier,
};

/// Lifecycle hooks implemented per connection variant.
///
/// `after_accept` runs once the connection is subscribed to its group.
/// `before_disconnect` runs while it is still subscribed, so a broadcast made
/// there is still delivered to the leaving connection. `after_disconnect` runs
/// after the transport is closed, on every exit path, even if
/// `before_disconnect` failed.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConnectionHooks: Send + Sync {
    /// Prefix of the broadcast group name of this variant
    fn group_prefix(&self) -> &'static str;

    async fn after_accept(&self, connection: &Connection) -> Result<(), LifecycleError>;

    async fn before_disconnect(&self, connection: &Connection) -> Result<(), LifecycleError>;

    async fn after_disconnect(&self, connection: &Connection);
}

/// A connection request that passed the admission checks
#[derive(Debug, Clone)]
pub struct Admission {
    pub user: User,
    pub room: Room,
    pub group: GroupName,
}

/// An accepted, subscribed connection
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    pub user: User,
    pub member: Member,
    pub room: Room,
    pub group: GroupName,
}

/// 接続ライフサイクルのユースケース
pub struct LifecycleController {
    users: Arc<dyn UserRepository>,
    rooms: Arc<dyn RoomRepository>,
    broadcaster: Arc<dyn GroupBroadcaster>,
    presence: Arc<PresenceNotifier>,
    hooks: Arc<dyn ConnectionHooks>,
}

impl LifecycleController {
    pub fn new(
        users: Arc<dyn UserRepository>,
        rooms: Arc<dyn RoomRepository>,
        broadcaster: Arc<dyn GroupBroadcaster>,
        presence: Arc<PresenceNotifier>,
        hooks: Arc<dyn ConnectionHooks>,
    ) -> Self {
        Self {
            users,
            rooms,
            broadcaster,
            presence,
            hooks,
        }
    }

    /// Decide whether `user_id` may open a socket to `room_id`
    ///
    /// # Errors
    ///
    /// * `UnknownUser` - the session does not resolve to a user
    /// * `RoomNotFound` - no such room
    /// * `AuthorizationDenied` - the room's predicate rejects the user
    /// * `AlreadyConnected` - the user already has a socket joined to this room
    pub async fn admit(&self, user_id: UserId, room_id: RoomId) -> Result<Admission, ConnectError> {
        let user = self.users.get_user(user_id).await.map_err(|e| match e {
            RepositoryError::UserNotFound(id) => ConnectError::UnknownUser(id),
            other => ConnectError::SetupFailed(other.to_string()),
        })?;

        let room = self.rooms.get_room(room_id).await.map_err(|e| match e {
            RepositoryError::RoomNotFound(id) => ConnectError::RoomNotFound(id),
            other => ConnectError::SetupFailed(other.to_string()),
        })?;

        let authorized = self
            .rooms
            .is_authorized(&room, &user)
            .await
            .map_err(|e| ConnectError::SetupFailed(e.to_string()))?;
        if !authorized {
            return Err(ConnectError::AuthorizationDenied {
                room: room.id,
                user: user.id,
            });
        }

        let group = GroupName::for_room(self.hooks.group_prefix(), room.id);
        if self
            .presence
            .is_member(&group, &ClientKey::for_user(user.id))
            .await
        {
            return Err(ConnectError::AlreadyConnected {
                room: room.id,
                user: user.id,
            });
        }

        Ok(Admission { user, room, group })
    }

    /// Subscribe the accepted socket to its group and run the join hook.
    ///
    /// On hook failure the subscription is undone and `SetupFailed` is returned.
    pub async fn accept(
        &self,
        admission: Admission,
        outbox: Outbox,
    ) -> Result<ConnectionGuard, ConnectError> {
        let Admission { user, room, group } = admission;
        let connection = Connection {
            id: ConnectionId::generate(),
            member: Member::from_user(&user),
            user,
            room,
            group,
        };

        self.broadcaster
            .subscribe(&connection.group, connection.id, outbox)
            .await;

        if let Err(e) = self.hooks.after_accept(&connection).await {
            self.broadcaster
                .unsubscribe(&connection.group, connection.id)
                .await;
            return Err(ConnectError::SetupFailed(e.to_string()));
        }

        tracing::info!(
            "Connection '{}' of '{}' accepted into '{}'",
            connection.id,
            connection.member.client_key,
            connection.group
        );

        Ok(ConnectionGuard {
            connection,
            broadcaster: self.broadcaster.clone(),
            hooks: self.hooks.clone(),
            armed: true,
        })
    }
}

/// Scoped ownership of an accepted connection; runs the teardown sequence once
pub struct ConnectionGuard {
    connection: Connection,
    broadcaster: Arc<dyn GroupBroadcaster>,
    hooks: Arc<dyn ConnectionHooks>,
    armed: bool,
}

impl ConnectionGuard {
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Leave hook, unsubscribe, `close_transport`, post-teardown hook.
    ///
    /// The sequence runs on its own task and completes even if the caller
    /// stops waiting for it.
    pub async fn teardown<F>(mut self, close_transport: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.armed = false;
        let task = tokio::spawn(run_teardown(
            self.broadcaster.clone(),
            self.hooks.clone(),
            self.connection.clone(),
            close_transport,
        ));
        if let Err(e) = task.await {
            tracing::error!(
                "Teardown of connection '{}' failed: {}",
                self.connection.id,
                e
            );
        }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.armed = false;

        tracing::warn!(
            "Connection '{}' dropped without teardown, tearing down in background",
            self.connection.id
        );
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(run_teardown(
                    self.broadcaster.clone(),
                    self.hooks.clone(),
                    self.connection.clone(),
                    std::future::ready(()),
                ));
            }
            Err(_) => tracing::error!(
                "No runtime available to tear down connection '{}'",
                self.connection.id
            ),
        }
    }
}

async fn run_teardown<F>(
    broadcaster: Arc<dyn GroupBroadcaster>,
    hooks: Arc<dyn ConnectionHooks>,
    connection: Connection,
    close_transport: F,
) where
    F: Future<Output = ()> + Send,
{
    if let Err(e) = hooks.before_disconnect(&connection).await {
        tracing::error!(
            "Leave hook failed for connection '{}' of '{}': {}",
            connection.id,
            connection.member.client_key,
            e
        );
    }

    broadcaster
        .unsubscribe(&connection.group, connection.id)
        .await;

    close_transport.await;

    hooks.after_disconnect(&connection).await;

    tracing::info!(
        "Connection '{}' of '{}' torn down",
        connection.id,
        connection.member.client_key
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{
            DisplayName, GroupEvent, RegistryError,
            repository::{MockRoomRepository, MockUserRepository},
        },
        infrastructure::broadcast::InMemoryGroupBroadcaster,
    };
    use std::{sync::Mutex as StdMutex, time::Duration};
    use tokio::sync::mpsc;

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - admit: ユーザー・ルームの解決、参加可否、重複接続
    // - accept: 購読と参加フック、フック失敗時の購読解除
    // - teardown: フックの呼び出し順、退出フック失敗時も prune が一度だけ走ること
    // - guard の破棄時に後片付けが起動されること
    // - 呼び出し側が teardown を待たずに破棄しても後片付けが完了すること
    // - 実際のチャット用フックで、退出者自身にも退出通知が届くこと
    //
    // 【なぜこのテストが必要か】
    // - 後片付けの漏れや二重実行はメンバー一覧の不整合に直結する
    //
    // 【どのようなシナリオをテストするか】
    // 1. 正常な受付と各種拒否
    // 2. teardown の順序
    // 3. 退出フック失敗時の teardown
    // 4. teardown せずに guard を破棄
    // 5. teardown の完了を待たずに打ち切る
    // 6. ChatHooks と InMemoryGroupBroadcaster を組み合わせた退出
    // ========================================

    /// Records hook calls in order
    #[derive(Default)]
    struct RecordingHooks {
        calls: StdMutex<Vec<&'static str>>,
        fail_accept: bool,
        fail_leave: bool,
        leave_delay: Option<Duration>,
    }

    impl RecordingHooks {
        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: &'static str) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl ConnectionHooks for RecordingHooks {
        fn group_prefix(&self) -> &'static str {
            "test-room"
        }

        async fn after_accept(&self, connection: &Connection) -> Result<(), LifecycleError> {
            self.record("after_accept");
            if self.fail_accept {
                return Err(LifecycleError::Registry(RegistryError::AlreadyMember {
                    group: connection.group.clone(),
                    client_key: connection.member.client_key.clone(),
                }));
            }
            Ok(())
        }

        async fn before_disconnect(&self, connection: &Connection) -> Result<(), LifecycleError> {
            self.record("before_disconnect");
            if let Some(delay) = self.leave_delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_leave {
                return Err(LifecycleError::Registry(RegistryError::NotMember {
                    group: connection.group.clone(),
                    client_key: connection.member.client_key.clone(),
                }));
            }
            Ok(())
        }

        async fn after_disconnect(&self, _connection: &Connection) {
            self.record("after_disconnect");
        }
    }

    fn alice() -> User {
        User::new(UserId::new(1), DisplayName::new("alice".to_string()).unwrap())
    }

    fn room7() -> Room {
        Room::new(RoomId::new(7), "Room 7".to_string(), UserId::new(1), vec![UserId::new(2)])
    }

    fn users_returning(user: User) -> MockUserRepository {
        let mut users = MockUserRepository::new();
        users
            .expect_get_user()
            .returning(move |_| Ok(user.clone()));
        users
    }

    fn rooms_returning(room: Room, authorized: bool) -> MockRoomRepository {
        let mut rooms = MockRoomRepository::new();
        rooms.expect_get_room().returning(move |_| Ok(room.clone()));
        rooms
            .expect_is_authorized()
            .returning(move |_, _| Ok(authorized));
        rooms
    }

    struct Fixture {
        controller: LifecycleController,
        broadcaster: Arc<InMemoryGroupBroadcaster>,
        presence: Arc<PresenceNotifier>,
        hooks: Arc<RecordingHooks>,
    }

    fn fixture(
        users: MockUserRepository,
        rooms: MockRoomRepository,
        hooks: RecordingHooks,
    ) -> Fixture {
        let broadcaster = Arc::new(InMemoryGroupBroadcaster::new());
        let presence = Arc::new(PresenceNotifier::new(broadcaster.clone()));
        let hooks = Arc::new(hooks);
        let controller = LifecycleController::new(
            Arc::new(users),
            Arc::new(rooms),
            broadcaster.clone(),
            presence.clone(),
            hooks.clone(),
        );
        Fixture {
            controller,
            broadcaster,
            presence,
            hooks,
        }
    }

    #[tokio::test]
    async fn test_admit_success() {
        // テスト項目: 参加を許可されたユーザーは受け付けられ、グループ名が決まる
        // given (前提条件):
        let f = fixture(
            users_returning(alice()),
            rooms_returning(room7(), true),
            RecordingHooks::default(),
        );

        // when (操作):
        let admission = f.controller.admit(UserId::new(1), RoomId::new(7)).await.unwrap();

        // then (期待する結果):
        assert_eq!(admission.user, alice());
        assert_eq!(admission.room.id, RoomId::new(7));
        assert_eq!(admission.group.as_str(), "test-room7");
    }

    #[tokio::test]
    async fn test_admit_unknown_user() {
        // テスト項目: 解決できないユーザーは UnknownUser になる
        // given (前提条件):
        let mut users = MockUserRepository::new();
        users
            .expect_get_user()
            .returning(|id| Err(RepositoryError::UserNotFound(id)));
        let mut rooms = MockRoomRepository::new();
        rooms.expect_get_room().never();
        let f = fixture(users, rooms, RecordingHooks::default());

        // when (操作):
        let result = f.controller.admit(UserId::new(9), RoomId::new(7)).await;

        // then (期待する結果):
        assert!(matches!(result, Err(ConnectError::UnknownUser(id)) if id == UserId::new(9)));
    }

    #[tokio::test]
    async fn test_admit_room_not_found() {
        // テスト項目: 存在しないルームへの接続は RoomNotFound になる
        // given (前提条件):
        let mut rooms = MockRoomRepository::new();
        rooms
            .expect_get_room()
            .returning(|id| Err(RepositoryError::RoomNotFound(id)));
        rooms.expect_is_authorized().never();
        let f = fixture(users_returning(alice()), rooms, RecordingHooks::default());

        // when (操作):
        let result = f.controller.admit(UserId::new(1), RoomId::new(8)).await;

        // then (期待する結果):
        assert!(matches!(result, Err(ConnectError::RoomNotFound(id)) if id == RoomId::new(8)));
    }

    #[tokio::test]
    async fn test_admit_authorization_denied() {
        // テスト項目: 参加を許可されていないユーザーは AuthorizationDenied になる
        // given (前提条件):
        let f = fixture(
            users_returning(alice()),
            rooms_returning(room7(), false),
            RecordingHooks::default(),
        );

        // when (操作):
        let result = f.controller.admit(UserId::new(1), RoomId::new(7)).await;

        // then (期待する結果):
        assert!(matches!(result, Err(ConnectError::AuthorizationDenied { .. })));
    }

    #[tokio::test]
    async fn test_admit_rejects_second_socket() {
        // テスト項目: 既に参加中のユーザーの二つ目の接続は AlreadyConnected になる
        // given (前提条件):
        let f = fixture(
            users_returning(alice()),
            rooms_returning(room7(), true),
            RecordingHooks::default(),
        );
        let group = GroupName::for_room("test-room", RoomId::new(7));
        f.presence
            .announce_join(&group, &Member::from_user(&alice()))
            .await
            .unwrap();

        // when (操作):
        let result = f.controller.admit(UserId::new(1), RoomId::new(7)).await;

        // then (期待する結果):
        assert!(matches!(result, Err(ConnectError::AlreadyConnected { .. })));
    }

    #[tokio::test]
    async fn test_accept_subscribes_then_runs_join_hook() {
        // テスト項目: 受付後に購読され、参加フックが呼ばれる
        // given (前提条件):
        let f = fixture(
            users_returning(alice()),
            rooms_returning(room7(), true),
            RecordingHooks::default(),
        );
        let admission = f.controller.admit(UserId::new(1), RoomId::new(7)).await.unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();

        // when (操作):
        let guard = f.controller.accept(admission, tx).await.unwrap();

        // then (期待する結果):
        assert_eq!(f.hooks.calls(), vec!["after_accept"]);
        assert_eq!(
            f.broadcaster
                .subscriber_count(&guard.connection().group)
                .await,
            1
        );
        assert_eq!(guard.connection().member.client_key.as_str(), "user1");
        guard.teardown(async {}).await;
    }

    #[tokio::test]
    async fn test_accept_failure_unsubscribes() {
        // テスト項目: 参加フックが失敗すると SetupFailed になり、購読が解除される
        // given (前提条件):
        let f = fixture(
            users_returning(alice()),
            rooms_returning(room7(), true),
            RecordingHooks {
                fail_accept: true,
                ..Default::default()
            },
        );
        let admission = f.controller.admit(UserId::new(1), RoomId::new(7)).await.unwrap();
        let group = admission.group.clone();
        let (tx, mut rx) = mpsc::unbounded_channel();

        // when (操作):
        let result = f.controller.accept(admission, tx).await;

        // then (期待する結果):
        assert!(matches!(result, Err(ConnectError::SetupFailed(_))));
        assert_eq!(f.broadcaster.subscriber_count(&group).await, 0);
        assert_eq!(rx.recv().await, None);
        assert_eq!(f.hooks.calls(), vec!["after_accept"]);
    }

    #[tokio::test]
    async fn test_teardown_order() {
        // テスト項目: 退出フック → 購読解除 → トランスポートのクローズ → 後処理フックの順に実行される
        // given (前提条件):
        let f = fixture(
            users_returning(alice()),
            rooms_returning(room7(), true),
            RecordingHooks::default(),
        );
        let admission = f.controller.admit(UserId::new(1), RoomId::new(7)).await.unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let guard = f.controller.accept(admission, tx).await.unwrap();
        let group = guard.connection().group.clone();
        let hooks = f.hooks.clone();
        let broadcaster = f.broadcaster.clone();

        // when (操作):
        guard
            .teardown(async move {
                // クローズ時点で購読は解除済み
                assert_eq!(broadcaster.subscriber_count(&group).await, 0);
                hooks.record("close_transport");
            })
            .await;

        // then (期待する結果):
        assert_eq!(
            f.hooks.calls(),
            vec![
                "after_accept",
                "before_disconnect",
                "close_transport",
                "after_disconnect"
            ]
        );
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_teardown_prunes_once_even_if_leave_hook_fails() {
        // テスト項目: 退出フックが失敗しても後処理フックはちょうど一度実行される
        // given (前提条件):
        let f = fixture(
            users_returning(alice()),
            rooms_returning(room7(), true),
            RecordingHooks {
                fail_leave: true,
                ..Default::default()
            },
        );
        let admission = f.controller.admit(UserId::new(1), RoomId::new(7)).await.unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();
        let guard = f.controller.accept(admission, tx).await.unwrap();

        // when (操作):
        guard.teardown(async {}).await;
        tokio::task::yield_now().await;

        // then (期待する結果):
        let calls = f.hooks.calls();
        assert_eq!(
            calls.iter().filter(|c| **c == "after_disconnect").count(),
            1
        );
        assert_eq!(
            calls.iter().filter(|c| **c == "before_disconnect").count(),
            1
        );
    }

    #[tokio::test]
    async fn test_dropped_guard_tears_down_in_background() {
        // テスト項目: teardown せずに guard を破棄しても後片付けが一度だけ実行される
        // given (前提条件):
        let f = fixture(
            users_returning(alice()),
            rooms_returning(room7(), true),
            RecordingHooks::default(),
        );
        let admission = f.controller.admit(UserId::new(1), RoomId::new(7)).await.unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();
        let guard = f.controller.accept(admission, tx).await.unwrap();
        let group = guard.connection().group.clone();

        // when (操作):
        drop(guard);
        for _ in 0..100 {
            if f.hooks.calls().contains(&"after_disconnect") {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        // then (期待する結果):
        assert_eq!(
            f.hooks.calls(),
            vec!["after_accept", "before_disconnect", "after_disconnect"]
        );
        assert_eq!(f.broadcaster.subscriber_count(&group).await, 0);
    }

    #[tokio::test]
    async fn test_teardown_completes_when_caller_stops_waiting() {
        // テスト項目: teardown の future が途中で破棄されても後片付けは最後まで実行される
        // given (前提条件):
        let f = fixture(
            users_returning(alice()),
            rooms_returning(room7(), true),
            RecordingHooks {
                leave_delay: Some(Duration::from_millis(50)),
                ..Default::default()
            },
        );
        let admission = f.controller.admit(UserId::new(1), RoomId::new(7)).await.unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();
        let guard = f.controller.accept(admission, tx).await.unwrap();
        let group = guard.connection().group.clone();

        // when (操作):
        let waited = tokio::time::timeout(Duration::from_millis(5), guard.teardown(async {})).await;
        for _ in 0..100 {
            if f.hooks.calls().contains(&"after_disconnect") {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        // then (期待する結果):
        assert!(waited.is_err());
        assert_eq!(
            f.hooks.calls(),
            vec!["after_accept", "before_disconnect", "after_disconnect"]
        );
        assert_eq!(f.broadcaster.subscriber_count(&group).await, 0);
    }

    #[tokio::test]
    async fn test_leaving_connection_receives_own_departure() {
        // テスト項目: 退出するクライアント自身にも退出通知が届き、空になったルームは削除される
        // given (前提条件):
        let broadcaster = Arc::new(InMemoryGroupBroadcaster::new());
        let presence = Arc::new(PresenceNotifier::new(broadcaster.clone()));
        let controller = LifecycleController::new(
            Arc::new(users_returning(alice())),
            Arc::new(rooms_returning(room7(), true)),
            broadcaster.clone(),
            presence.clone(),
            Arc::new(crate::usecase::chat::ChatHooks::new(presence.clone())),
        );
        let admission = controller.admit(UserId::new(1), RoomId::new(7)).await.unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let guard = controller.accept(admission, tx).await.unwrap();
        let group = guard.connection().group.clone();

        // when (操作):
        guard.teardown(async {}).await;
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }

        // then (期待する結果):
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], GroupEvent::MemberJoined { members, .. } if members.len() == 1));
        assert!(matches!(
            events.last(),
            Some(GroupEvent::MemberLeft { member, members })
                if member.client_key.as_str() == "user1" && members.is_empty()
        ));
        assert!(!presence.has_room(&group).await);
    }

    #[tokio::test]
    async fn test_mocked_hooks_receive_connection() {
        // テスト項目: フックには受け付けた接続の情報が渡される
        // given (前提条件):
        let mut hooks = MockConnectionHooks::new();
        hooks.expect_group_prefix().return_const("chat-room");
        hooks
            .expect_after_accept()
            .withf(|c| c.member.client_key.as_str() == "user1" && c.group.as_str() == "chat-room7")
            .times(1)
            .returning(|_| Ok(()));
        hooks
            .expect_before_disconnect()
            .times(1)
            .returning(|_| Ok(()));
        hooks.expect_after_disconnect().times(1).returning(|_| ());
        let broadcaster = Arc::new(InMemoryGroupBroadcaster::new());
        let controller = LifecycleController::new(
            Arc::new(users_returning(alice())),
            Arc::new(rooms_returning(room7(), true)),
            broadcaster.clone(),
            Arc::new(PresenceNotifier::new(broadcaster)),
            Arc::new(hooks),
        );
        let admission = controller.admit(UserId::new(1), RoomId::new(7)).await.unwrap();
        let (tx, _rx) = mpsc::unbounded_channel::<GroupEvent>();

        // when (操作):
        let guard = controller.accept(admission, tx).await.unwrap();
        guard.teardown(async {}).await;

        // then (期待する結果):
        // 期待回数は MockConnectionHooks の drop 時に検証される
        drop(controller);
    }
}
