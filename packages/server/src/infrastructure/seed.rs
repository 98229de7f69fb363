//! Seed data for the in-memory persistence layer.
//!
//! ```json
//! {
//!   "users": [{"id": 1, "username": "alice"}, {"id": 2, "username": "bob"}],
//!   "rooms": [{"id": 7, "name": "Room 7", "owner": 1, "participants": [2]}]
//! }
//! ```

use std::{collections::HashSet, fs, path::Path};

use serde::Deserialize;
use thiserror::Error;

use crate::domain::{DisplayName, Room, RoomId, User, UserId, ValueObjectError};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read seed file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse seed data: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("user {id} has an invalid username: {source}")]
    InvalidUser {
        id: i64,
        #[source]
        source: ValueObjectError,
    },

    #[error("room {room} references unknown user {user}")]
    UnknownUser { room: i64, user: i64 },
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedData {
    pub users: Vec<SeedUser>,
    pub rooms: Vec<SeedRoom>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedUser {
    pub id: i64,
    pub username: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedRoom {
    pub id: i64,
    pub name: String,
    pub owner: i64,
    #[serde(default)]
    pub participants: Vec<i64>,
}

impl SeedData {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self, SeedError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Built-in data used when no seed file is given
    pub fn demo() -> Self {
        Self {
            users: vec![
                SeedUser {
                    id: 1,
                    username: "alice".to_string(),
                },
                SeedUser {
                    id: 2,
                    username: "bob".to_string(),
                },
                SeedUser {
                    id: 3,
                    username: "carol".to_string(),
                },
            ],
            rooms: vec![
                SeedRoom {
                    id: 1,
                    name: "Lobby".to_string(),
                    owner: 1,
                    participants: vec![2, 3],
                },
                SeedRoom {
                    id: 7,
                    name: "Room 7".to_string(),
                    owner: 1,
                    participants: vec![2],
                },
            ],
        }
    }

    /// Validate and convert into domain entities
    pub fn into_entities(self) -> Result<(Vec<User>, Vec<Room>), SeedError> {
        let users = self
            .users
            .into_iter()
            .map(|user| {
                DisplayName::new(user.username)
                    .map(|name| User::new(UserId::new(user.id), name))
                    .map_err(|source| SeedError::InvalidUser {
                        id: user.id,
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let known: HashSet<i64> = users.iter().map(|user| user.id.value()).collect();
        let rooms = self
            .rooms
            .into_iter()
            .map(|room| {
                if let Some(unknown) = std::iter::once(room.owner)
                    .chain(room.participants.iter().copied())
                    .find(|id| !known.contains(id))
                {
                    return Err(SeedError::UnknownUser {
                        room: room.id,
                        user: unknown,
                    });
                }
                Ok(Room::new(
                    RoomId::new(room.id),
                    room.name,
                    UserId::new(room.owner),
                    room.participants.into_iter().map(UserId::new).collect(),
                ))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok((users, rooms))
    }
}
