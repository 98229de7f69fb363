//! UseCase layer: connection lifecycle, presence announcements and message relay.

pub mod chat;
pub mod error;
pub mod lifecycle;
pub mod presence;
pub mod send_message;

pub use chat::{CHAT_GROUP_PREFIX, ChatHooks};
pub use error::{ConnectError, LifecycleError, SendMessageError};
pub use lifecycle::{Admission, Connection, ConnectionGuard, ConnectionHooks, LifecycleController};
pub use presence::PresenceNotifier;
pub use send_message::SendMessageUseCase;
