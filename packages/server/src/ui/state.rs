//! Server state shared by the handlers.

use std::sync::Arc;

use hiroba_shared::time::Clock;

use crate::usecase::{LifecycleController, SendMessageUseCase};

/// Shared application state
pub struct AppState {
    /// LifecycleController（接続の受付と後片付け）
    pub lifecycle: Arc<LifecycleController>,
    /// SendMessageUseCase（メッセージの永続化と配信）
    pub send_message: Arc<SendMessageUseCase>,
    /// 配信時刻の取得元
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(
        lifecycle: Arc<LifecycleController>,
        send_message: Arc<SendMessageUseCase>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            lifecycle,
            send_message,
            clock,
        }
    }
}
