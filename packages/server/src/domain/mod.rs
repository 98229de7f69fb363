//! Domain layer: entities, value objects, the presence registry and the
//! interfaces the outer layers implement.

pub mod broadcast;
pub mod entity;
pub mod error;
pub mod event;
pub mod presence;
pub mod repository;
pub mod value_object;

pub use broadcast::{EventReceiver, GroupBroadcaster, Outbox};
pub use entity::{ChatMessage, Member, Room, User};
pub use error::{BroadcastError, RegistryError, RepositoryError, ValueObjectError};
pub use event::{GroupEvent, Members};
pub use presence::RoomPresence;
pub use repository::{MessageRepository, RoomRepository, UserRepository};
pub use value_object::{ClientKey, ConnectionId, DisplayName, GroupName, RoomId, UserId};
