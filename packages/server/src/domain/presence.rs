//! Room membership registry.
//!
//! Pure bookkeeping of who is joined to which room group. Callers are
//! responsible for serializing access (see `usecase::presence`).

use std::collections::HashMap;

use super::{
    entity::Member,
    error::RegistryError,
    event::Members,
    value_object::{ClientKey, DisplayName, GroupName},
};

/// Mapping from group name to the members currently joined to it.
///
/// A room entry may exist with no members between the last leave and the
/// post-teardown prune.
#[derive(Debug, Default)]
pub struct RoomPresence {
    rooms: HashMap<GroupName, Members>,
}

impl RoomPresence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the member mapping of `group`, creating an empty one if missing
    pub fn get_or_create(&mut self, group: &GroupName) -> &mut Members {
        self.rooms.entry(group.clone()).or_default()
    }

    /// Add `member` to `group`
    pub fn insert(&mut self, group: &GroupName, member: &Member) -> Result<(), RegistryError> {
        let members = self.get_or_create(group);
        if members.contains_key(&member.client_key) {
            return Err(RegistryError::AlreadyMember {
                group: group.clone(),
                client_key: member.client_key.clone(),
            });
        }
        members.insert(member.client_key.clone(), member.display_name.clone());
        Ok(())
    }

    /// Remove `client_key` from `group`, keeping the order of the others
    pub fn remove(
        &mut self,
        group: &GroupName,
        client_key: &ClientKey,
    ) -> Result<DisplayName, RegistryError> {
        self.rooms
            .get_mut(group)
            .and_then(|members| members.shift_remove(client_key))
            .ok_or_else(|| RegistryError::NotMember {
                group: group.clone(),
                client_key: client_key.clone(),
            })
    }

    pub fn contains(&self, group: &GroupName, client_key: &ClientKey) -> bool {
        self.rooms
            .get(group)
            .is_some_and(|members| members.contains_key(client_key))
    }

    /// Snapshot of the members of `group` (empty if the room has no entry)
    pub fn members(&self, group: &GroupName) -> Members {
        self.rooms.get(group).cloned().unwrap_or_default()
    }

    /// Whether an entry exists for `group`, empty or not
    pub fn has_room(&self, group: &GroupName) -> bool {
        self.rooms.contains_key(group)
    }

    /// Whether `group` has no members
    pub fn is_empty(&self, group: &GroupName) -> bool {
        self.rooms.get(group).is_none_or(|members| members.is_empty())
    }

    /// Delete the entry of `group` if it has no members. Returns whether it was deleted.
    pub fn prune_if_empty(&mut self, group: &GroupName) -> bool {
        match self.rooms.get(group) {
            Some(members) if members.is_empty() => {
                self.rooms.remove(group);
                true
            }
            _ => false,
        }
    }

    /// Number of room entries (including empty ones not yet pruned)
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
