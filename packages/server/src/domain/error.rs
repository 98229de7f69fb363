//! Domain error types.

use thiserror::Error;

use super::value_object::{ClientKey, GroupName, RoomId, UserId};

/// Invalid value object input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("display name must not be empty")]
    EmptyDisplayName,
}

/// Persistence collaborator failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("room {0} not found")]
    RoomNotFound(RoomId),

    #[error("user {0} not found")]
    UserNotFound(UserId),

    #[error("persistence failed: {0}")]
    PersistenceFailed(String),
}

/// Membership registry consistency violations.
///
/// Either variant means join/leave notifications were issued out of order
/// for the same socket.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("'{client_key}' is not a member of '{group}'")]
    NotMember {
        group: GroupName,
        client_key: ClientKey,
    },

    #[error("'{client_key}' is already a member of '{group}'")]
    AlreadyMember {
        group: GroupName,
        client_key: ClientKey,
    },
}

/// Broadcast transport failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BroadcastError {
    #[error("broadcast transport unavailable: {0}")]
    Unavailable(String),
}
