//! Connected players and their bodies.
//!
//! The link is id-based both ways: a [`PlayerInfo`] names its body's
//! [`EntityId`], and the body's record names its [`PlayerId`].

use std::collections::{BTreeMap, BTreeSet};

use bloxim_core::{EntityId, PlayerId};

/// One connected player.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerInfo {
    /// Handle.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// The player's body.
    pub entity: EntityId,
    /// Inputs currently held down.
    pub pressed: BTreeSet<String>,
}

/// Player table.
#[derive(Debug, Default)]
pub struct PlayerTable {
    players: BTreeMap<PlayerId, PlayerInfo>,
    next_id: u32,
}

impl PlayerTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next player handle.
    pub fn allocate(&mut self) -> PlayerId {
        self.next_id += 1;
        PlayerId(self.next_id)
    }

    /// Records a joined player.
    pub fn insert(&mut self, id: PlayerId, name: &str, entity: EntityId) {
        self.players.insert(
            id,
            PlayerInfo {
                id,
                name: name.to_owned(),
                entity,
                pressed: BTreeSet::new(),
            },
        );
    }

    /// Removes a player.
    pub fn remove(&mut self, id: PlayerId) -> Option<PlayerInfo> {
        self.players.remove(&id)
    }

    /// Looks up a player.
    #[must_use]
    pub fn get(&self, id: PlayerId) -> Option<&PlayerInfo> {
        self.players.get(&id)
    }

    /// The player whose body is `entity`.
    #[must_use]
    pub fn by_entity(&self, entity: EntityId) -> Option<PlayerId> {
        self.players
            .values()
            .find(|p| p.entity == entity)
            .map(|p| p.id)
    }

    /// Records a press. Returns `false` if the input was already held or the
    /// player is unknown.
    pub fn press(&mut self, id: PlayerId, key: &str) -> bool {
        self.players
            .get_mut(&id)
            .is_some_and(|p| p.pressed.insert(key.to_owned()))
    }

    /// Records a release. Returns `false` if the input was not held or the
    /// player is unknown.
    pub fn release(&mut self, id: PlayerId, key: &str) -> bool {
        self.players
            .get_mut(&id)
            .is_some_and(|p| p.pressed.remove(key))
    }

    /// Players in join order.
    pub fn iter(&self) -> impl Iterator<Item = &PlayerInfo> + '_ {
        self.players.values()
    }

    /// Number of connected players.
    #[must_use]
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// True if nobody is connected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_press_release_edges() {
        let mut table = PlayerTable::new();
        let id = table.allocate();
        let body = EntityId::new(3, 0);
        table.insert(id, "ada", body);

        assert!(table.press(id, "jump"));
        assert!(!table.press(id, "jump"));
        assert!(table.release(id, "jump"));
        assert!(!table.release(id, "jump"));
        assert!(!table.press(PlayerId(99), "jump"));

        assert_eq!(table.by_entity(body), Some(id));
        assert_eq!(table.remove(id).map(|p| p.name), Some("ada".to_owned()));
        assert!(table.is_empty());
    }
}
