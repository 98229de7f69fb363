//! UseCase error types.

use thiserror::Error;

use crate::domain::{BroadcastError, RegistryError, RepositoryError, RoomId, UserId};

/// Reasons a connection is not admitted or not set up
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    #[error("user {0} is not signed in")]
    UnknownUser(UserId),

    #[error("room {0} not found")]
    RoomNotFound(RoomId),

    #[error("user {user} may not join room {room}")]
    AuthorizationDenied { room: RoomId, user: UserId },

    #[error("user {user} is already connected to room {room}")]
    AlreadyConnected { room: RoomId, user: UserId },

    #[error("connection setup failed: {0}")]
    SetupFailed(String),
}

/// Failure of a lifecycle hook
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Broadcast(#[from] BroadcastError),
}

/// Failure while relaying a chat message
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendMessageError {
    #[error("failed to persist message: {0}")]
    Persistence(RepositoryError),

    #[error(transparent)]
    Broadcast(#[from] BroadcastError),
}
